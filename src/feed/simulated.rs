use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tokio::time::{interval, MissedTickBehavior};

use super::error::FeedError;
use super::station::GroundStation;
use super::tle::TleCatalog;
use crate::config::SimulationConfig;
use crate::radar::{RawSatellite, StatusSender};

/// Produces the sky seen from a fixed station by propagating a TLE catalog.
pub struct SkySimulator {
    catalog: TleCatalog,
    station: GroundStation,
    fix_mask_deg: f64,
}

impl SkySimulator {
    pub fn new(catalog: TleCatalog, station: GroundStation, fix_mask_deg: f64) -> Self {
        Self {
            catalog,
            station,
            fix_mask_deg,
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Result<Self, FeedError> {
        let station =
            GroundStation::from_coordinates(&config.station.coordinates, config.station.altitude_m)?;
        let mut catalog = TleCatalog::new(config.tle_folder.clone());
        catalog.load_all()?;
        if let Some(name) = &config.station.name {
            log::info!("Simulating sky over {} ({} satellites)", name, catalog.len());
        }
        Ok(Self::new(catalog, station, config.fix_mask_deg))
    }

    /// Satellites above the horizon at `at`. Those above the fix mask are
    /// flagged as used.
    pub fn epoch(&self, at: DateTime<Utc>) -> Vec<RawSatellite> {
        self.catalog
            .satellites()
            .filter_map(|sat| {
                match self.station.observe(&sat.elements, &sat.constants, at) {
                    Ok(look) => Some((sat, look)),
                    Err(e) => {
                        log::debug!("Skipping {}: {}", sat.name, e);
                        None
                    }
                }
            })
            .filter(|(_, look)| look.elevation_deg >= 0.0)
            .map(|(sat, look)| RawSatellite {
                azimuth_deg: look.azimuth_deg,
                elevation_deg: look.elevation_deg,
                svid: sat.svid,
                constellation: sat.constellation.code(),
                used_in_fix: look.elevation_deg >= self.fix_mask_deg,
            })
            .collect()
    }
}

pub async fn run_simulation_loop(
    simulator: SkySimulator,
    period: Duration,
    status_tx: StatusSender,
    mut stop_rx: oneshot::Receiver<()>,
) -> Result<(), FeedError> {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut stop_rx => break,
        }
        let epoch = simulator.epoch(Utc::now());
        log::debug!("Simulated epoch with {} satellites", epoch.len());
        status_tx
            .send(epoch)
            .await
            .map_err(|_| FeedError::ChannelClosed)?;
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::{run_simulation_loop, SkySimulator};
    use crate::feed::station::GroundStation;
    use crate::feed::tle::{test::GPS_TLE, TleCatalog};
    use crate::radar::{status_channel, Constellation};
    use chrono::{TimeZone, Utc};
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn catalog_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("sky-radar-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("gps.tle"), GPS_TLE).unwrap();
        std::fs::write(dir.join("notes.md"), "not a tle").unwrap();
        dir
    }

    fn simulator(dir: &std::path::Path, lon: f64) -> SkySimulator {
        let mut catalog = TleCatalog::new(dir.to_path_buf());
        catalog.load_all().unwrap();
        assert_eq!(catalog.len(), 1);
        let station = GroundStation {
            latitude_deg: 0.0,
            longitude_deg: lon,
            altitude_m: 0.0,
        };
        SkySimulator::new(catalog, station, 15.0)
    }

    #[test]
    fn reports_only_satellites_above_horizon() {
        let dir = catalog_dir("sim");
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

        let mut seen = 0;
        for lon in (-180..180).step_by(30) {
            let epoch = simulator(&dir, lon as f64).epoch(at);
            for sat in &epoch {
                assert!(sat.elevation_deg >= 0.0);
                assert_eq!(sat.used_in_fix, sat.elevation_deg >= 15.0);
                assert_eq!(sat.svid, 13);
                assert_eq!(sat.constellation, Constellation::Gps.code());
                assert!((0.0..360.0).contains(&sat.azimuth_deg));
            }
            seen += epoch.len();
        }
        // a GPS orbit is visible from some point of the equator at any time
        assert!(seen > 0);
        assert!(seen < 12);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_stops_on_request() {
        crate::tests::init_logger();
        let dir = catalog_dir("sim-loop");
        let (tx, mut rx) = status_channel();
        let (stop_tx, stop_rx) = oneshot::channel();
        let worker = tokio::spawn(run_simulation_loop(
            simulator(&dir, 0.0),
            Duration::from_secs(1),
            tx,
            stop_rx,
        ));

        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_some());
        stop_tx.send(()).unwrap();
        // ends once the worker drops its sender
        while rx.recv().await.is_some() {}
        worker.await.unwrap().unwrap();
    }
}
