use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, oneshot, watch};

use super::filter::{apply_status, FilterState};
use super::prefs::{FilterStore, PrefsError};
use super::snapshot::{Snapshot, SnapshotStore, StatusListing};
use super::types::RawSatellite;

/// Capacity of the status hand-off channel.
pub const STATUS_QUEUE: usize = 16;

pub type StatusSender = mpsc::Sender<Vec<RawSatellite>>;
pub type StatusReceiver = mpsc::Receiver<Vec<RawSatellite>>;

pub fn status_channel() -> (StatusSender, StatusReceiver) {
    mpsc::channel(STATUS_QUEUE)
}

/// Filter and status the current snapshot was built from.
struct Inputs {
    filter: FilterState,
    last_raw: Vec<RawSatellite>,
}

/// Owns the active filter and the current snapshot.
///
/// Every write holds `inputs` from reading the filter until the snapshot is
/// installed and, for filter changes, saved. The installed snapshot and the
/// stored preferences therefore always match the live filter.
pub struct RadarManager {
    inputs: Mutex<Inputs>,
    snapshots: SnapshotStore,
    store: Box<dyn FilterStore>,
    redraw: watch::Sender<u64>,
}

impl RadarManager {
    /// Builds a manager with the filter found in `store`, falling back to
    /// the defaults when it cannot be read.
    pub fn new(store: Box<dyn FilterStore>) -> Self {
        let filter = match store.load() {
            Ok(filter) => filter,
            Err(e) => {
                log::warn!("Failed to load radar preferences, using defaults: {}", e);
                FilterState::default()
            }
        };
        let (redraw, _) = watch::channel(0);

        Self {
            inputs: Mutex::new(Inputs {
                filter,
                last_raw: Vec::new(),
            }),
            snapshots: SnapshotStore::default(),
            store,
            redraw,
        }
    }

    fn inputs(&self) -> MutexGuard<'_, Inputs> {
        self.inputs.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn filter(&self) -> FilterState {
        self.inputs().filter.clone()
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshots.current()
    }

    /// Listing of the last status, unfiltered.
    pub fn listing(&self) -> StatusListing {
        StatusListing::new(&self.inputs().last_raw)
    }

    /// Filters a fresh status and installs it as the current snapshot.
    pub fn apply_status(&self, raw: Vec<RawSatellite>) -> Arc<Snapshot> {
        let current = {
            let mut inputs = self.inputs();
            let snapshot = apply_status(&raw, &inputs.filter);
            log::trace!(
                "Status update: {} raw, {} visible, {} used",
                raw.len(),
                snapshot.visible(),
                snapshot.used()
            );
            inputs.last_raw = raw;
            self.snapshots.replace(snapshot);
            self.snapshots.current()
        };
        self.request_redraw();
        current
    }

    /// Replaces the active filter, persists it and re-filters the last
    /// status so the change shows without waiting for the next update.
    ///
    /// The in-memory filter changes even when persisting fails.
    pub fn update_filter(&self, filter: FilterState) -> Result<Arc<Snapshot>, PrefsError> {
        let (current, saved) = {
            let mut inputs = self.inputs();
            self.snapshots.replace(apply_status(&inputs.last_raw, &filter));
            log::info!(
                "Radar filter changed: {:?}, show unused: {}",
                filter.enabled,
                filter.show_unused
            );
            let saved = self.store.save(&filter);
            inputs.filter = filter;
            (self.snapshots.current(), saved)
        };
        self.request_redraw();
        saved?;
        Ok(current)
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.redraw.subscribe()
    }

    pub fn redraw_sender(&self) -> watch::Sender<u64> {
        self.redraw.clone()
    }

    pub fn request_redraw(&self) {
        self.redraw
            .send_modify(|generation| *generation = generation.wrapping_add(1));
    }
}

/// Drains the status channel into `manager` until the channel closes or
/// `stop_rx` fires.
pub async fn run_ingest_loop(
    manager: Arc<RadarManager>,
    mut status_rx: StatusReceiver,
    mut stop_rx: oneshot::Receiver<()>,
) {
    loop {
        let next = tokio::select! {
            status = status_rx.recv() => status,
            _ = &mut stop_rx => None,
        };
        match next {
            Some(raw) => {
                manager.apply_status(raw);
            }
            None => break,
        }
    }
    log::debug!("Status ingest stopped");
}

#[cfg(test)]
mod test {
    use super::{run_ingest_loop, status_channel, RadarManager};
    use crate::radar::{
        Constellation, FilterState, FilterStore, MemoryFilterStore, PrefsError, RawSatellite,
    };
    use crate::tests::init_logger;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn raw(svid: u32, code: i32, used: bool) -> RawSatellite {
        RawSatellite {
            azimuth_deg: 40.0,
            elevation_deg: 35.0,
            svid,
            constellation: code,
            used_in_fix: used,
        }
    }

    #[test]
    fn filter_change_refilters_last_status() {
        init_logger();
        let manager = RadarManager::new(Box::new(MemoryFilterStore::default()));
        manager.apply_status(vec![raw(1, 1, true), raw(2, 3, false), raw(3, 6, true)]);
        assert_eq!(manager.snapshot().visible(), 3);

        let snapshot = manager
            .update_filter(FilterState::new([Constellation::Glonass], true))
            .unwrap();
        assert_eq!(snapshot.visible(), 1);
        assert_eq!(snapshot.used(), 0);
        assert_eq!(manager.snapshot().records()[0].svid, 2);

        let snapshot = manager
            .update_filter(FilterState::new(Constellation::KNOWN, false))
            .unwrap();
        assert_eq!((snapshot.visible(), snapshot.used()), (2, 2));
    }

    #[test]
    fn listing_ignores_the_filter() {
        let manager = RadarManager::new(Box::new(MemoryFilterStore::default()));
        manager
            .update_filter(FilterState::new([Constellation::Gps], false))
            .unwrap();
        manager.apply_status(vec![raw(1, 1, true), raw(2, 3, false), raw(3, 6, true)]);
        assert_eq!(manager.snapshot().visible(), 1);
        assert!(manager
            .listing()
            .to_string()
            .starts_with("Satellites detected: 3\n"));
    }

    #[test]
    fn filter_is_loaded_and_persisted() {
        let store = MemoryFilterStore::default();
        let hidden = FilterState::new([Constellation::Beidou], false);
        crate::radar::FilterStore::save(&store, &hidden).unwrap();

        let manager = RadarManager::new(Box::new(store));
        assert_eq!(manager.filter(), hidden);
        manager.apply_status(vec![raw(5, 5, false), raw(6, 5, true)]);
        assert_eq!(manager.snapshot().visible(), 1);
    }

    #[test]
    fn updates_request_redraw() {
        let manager = RadarManager::new(Box::new(MemoryFilterStore::default()));
        let rx = manager.subscribe();
        let before = *rx.borrow();
        manager.apply_status(vec![raw(1, 1, true)]);
        manager.update_filter(FilterState::default()).unwrap();
        assert_eq!(*rx.borrow(), before + 2);
    }

    #[tokio::test]
    async fn ingest_applies_until_closed() {
        let manager = Arc::new(RadarManager::new(Box::new(MemoryFilterStore::default())));
        let (tx, rx) = status_channel();
        let (_stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(run_ingest_loop(manager.clone(), rx, stop_rx));

        tx.send(vec![raw(9, 1, true)]).await.unwrap();
        tx.send(vec![raw(10, 1, false), raw(11, 6, true)]).await.unwrap();
        drop(tx);
        task.await.unwrap();

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.visible(), 2);
        assert_eq!(snapshot.used(), 1);
    }

    /// Store whose GPS saves are slow, so a later update can overtake them.
    #[derive(Default)]
    struct SlowGpsStore {
        saved: Arc<Mutex<Option<FilterState>>>,
    }

    impl FilterStore for SlowGpsStore {
        fn load(&self) -> Result<FilterState, PrefsError> {
            Ok(FilterState::default())
        }

        fn save(&self, filter: &FilterState) -> Result<(), PrefsError> {
            if filter.enabled.contains(&Constellation::Gps) {
                thread::sleep(Duration::from_millis(200));
            }
            *self.saved.lock().unwrap() = Some(filter.clone());
            Ok(())
        }
    }

    #[test]
    fn concurrent_filter_updates_persist_the_active_filter() {
        init_logger();
        let store = SlowGpsStore::default();
        let saved = store.saved.clone();
        let manager = Arc::new(RadarManager::new(Box::new(store)));
        manager.apply_status(vec![raw(1, 1, true), raw(2, 6, true)]);

        let first = {
            let manager = manager.clone();
            thread::spawn(move || {
                manager
                    .update_filter(FilterState::new([Constellation::Gps], true))
                    .unwrap();
            })
        };
        thread::sleep(Duration::from_millis(50));
        let second = {
            let manager = manager.clone();
            thread::spawn(move || {
                manager
                    .update_filter(FilterState::new([Constellation::Galileo], true))
                    .unwrap();
            })
        };
        first.join().unwrap();
        second.join().unwrap();

        let active = manager.filter();
        assert_eq!(saved.lock().unwrap().as_ref(), Some(&active));
        let records = manager.snapshot();
        assert!(records
            .records()
            .iter()
            .all(|r| active.enabled.contains(&r.constellation)));
    }

    #[test]
    fn status_during_filter_change_uses_the_new_filter() {
        let manager = Arc::new(RadarManager::new(Box::new(SlowGpsStore::default())));
        let update = {
            let manager = manager.clone();
            thread::spawn(move || {
                manager
                    .update_filter(FilterState::new([Constellation::Gps], true))
                    .unwrap();
            })
        };
        thread::sleep(Duration::from_millis(50));
        manager.apply_status(vec![raw(1, 1, true), raw(2, 6, true)]);
        update.join().unwrap();

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.visible(), 1);
        assert_eq!(snapshot.records()[0].constellation, Constellation::Gps);
    }
}
