mod filter;
mod manager;
mod prefs;
mod projection;
mod service;
mod snapshot;
mod sweep;
mod types;

pub use filter::{apply_status, filter_records, FilterState};
pub use manager::{status_channel, RadarManager, StatusReceiver, StatusSender};
pub use prefs::{FilterStore, MemoryFilterStore, PrefsError, YamlFilterStore};
pub use projection::Projection;
pub use service::RadarService;
pub use snapshot::Snapshot;
pub use sweep::{SweepAngle, SweepAnimator, SweepHandle, DEFAULT_INTERVAL, DEFAULT_STEP_DEG};
pub use types::{Constellation, RawSatellite, SatelliteRecord};
