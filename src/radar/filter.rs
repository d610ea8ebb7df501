use std::collections::BTreeSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::snapshot::Snapshot;
use super::types::{Constellation, RawSatellite, SatelliteRecord};

/// Which satellites the radar shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FilterState {
    pub enabled: BTreeSet<Constellation>,
    pub show_unused: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            enabled: Constellation::KNOWN.into_iter().collect(),
            show_unused: true,
        }
    }
}

impl FilterState {
    /// Builds a filter; `Unknown` is dropped since it cannot be selected.
    pub fn new(enabled: impl IntoIterator<Item = Constellation>, show_unused: bool) -> Self {
        Self {
            enabled: enabled
                .into_iter()
                .filter(|c| *c != Constellation::Unknown)
                .collect(),
            show_unused,
        }
    }

    pub fn is_enabled(&self, constellation: Constellation) -> bool {
        self.enabled.contains(&constellation)
    }

    pub fn accepts(&self, record: &SatelliteRecord) -> bool {
        self.is_enabled(record.constellation) && (self.show_unused || record.used_in_fix)
    }
}

/// Turns a raw status into a snapshot holding only the records `filter`
/// accepts, in input order.
pub fn apply_status(raw: &[RawSatellite], filter: &FilterState) -> Snapshot {
    let records = raw
        .iter()
        .map(SatelliteRecord::from)
        .filter(|r| filter.accepts(r))
        .collect();
    Snapshot::new(records, Utc::now())
}

/// Same as [apply_status] for records that were already converted.
pub fn filter_records(records: &[SatelliteRecord], filter: &FilterState) -> Vec<SatelliteRecord> {
    records
        .iter()
        .filter(|r| filter.accepts(r))
        .cloned()
        .collect()
}
