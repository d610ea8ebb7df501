use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::types::{RawSatellite, SatelliteRecord};

/// Satellites valid at one instant, with their derived counts.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Snapshot {
    received_at: DateTime<Utc>,
    records: Vec<SatelliteRecord>,
    visible: usize,
    used: usize,
}

impl Snapshot {
    pub fn new(records: Vec<SatelliteRecord>, received_at: DateTime<Utc>) -> Self {
        let used = records.iter().filter(|r| r.used_in_fix).count();
        Self {
            received_at,
            visible: records.len(),
            used,
            records,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Utc::now())
    }

    pub fn records(&self) -> &[SatelliteRecord] {
        &self.records
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn visible(&self) -> usize {
        self.visible
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Text listing of every satellite the last status reported, whatever the
/// filter hides.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusListing {
    records: Vec<SatelliteRecord>,
}

impl StatusListing {
    pub fn new(raw: &[RawSatellite]) -> Self {
        Self {
            records: raw.iter().map(SatelliteRecord::from).collect(),
        }
    }
}

impl fmt::Display for StatusListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let used = self.records.iter().filter(|r| r.used_in_fix).count();
        writeln!(f, "Satellites detected: {}", self.records.len())?;
        writeln!(f, "Used in fix: {}", used)?;
        writeln!(f)?;
        for (i, r) in self.records.iter().enumerate() {
            writeln!(
                f,
                "Sat #{}: {}-{} | Az: {}° | El: {}° | Used in fix: {}",
                i + 1,
                r.constellation.abbreviation(),
                r.svid,
                r.azimuth_deg as i64,
                r.elevation_deg as i64,
                if r.used_in_fix { "yes" } else { "no" }
            )?;
        }
        Ok(())
    }
}

/// Holder of the current snapshot.
///
/// The lock only covers swapping or cloning the `Arc`: readers get an
/// immutable snapshot they can iterate freely while a writer installs the
/// next one.
#[derive(Debug)]
pub struct SnapshotStore {
    current: Mutex<Arc<Snapshot>>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self {
            current: Mutex::new(Arc::new(Snapshot::empty())),
        }
    }
}

impl SnapshotStore {
    pub fn current(&self) -> Arc<Snapshot> {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Installs `snapshot`, returning the one it replaced.
    pub fn replace(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let next = Arc::new(snapshot);
        let mut locked = self.current.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *locked, next)
    }
}
