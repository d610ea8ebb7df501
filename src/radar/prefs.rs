use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::filter::FilterState;
use super::types::Constellation;

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Where the user's filter choice lives between runs.
pub trait FilterStore: Send + Sync {
    fn load(&self) -> Result<FilterState, PrefsError>;
    fn save(&self, filter: &FilterState) -> Result<(), PrefsError>;
}

/// On-disk layout: constellation codes as strings plus the unused toggle.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredPrefs {
    #[serde(default)]
    selected_constellations: Option<Vec<String>>,
    #[serde(default)]
    show_unused_sats: Option<bool>,
}

impl StoredPrefs {
    fn into_filter(self) -> FilterState {
        let defaults = FilterState::default();
        let enabled = match self.selected_constellations {
            None => defaults.enabled,
            Some(codes) => codes
                .iter()
                .filter_map(|s| s.trim().parse::<i32>().ok())
                .map(Constellation::from_code)
                .filter(|c| *c != Constellation::Unknown)
                .collect(),
        };
        FilterState {
            enabled,
            show_unused: self.show_unused_sats.unwrap_or(defaults.show_unused),
        }
    }

    fn from_filter(filter: &FilterState) -> Self {
        Self {
            selected_constellations: Some(
                filter.enabled.iter().map(|c| c.code().to_string()).collect(),
            ),
            show_unused_sats: Some(filter.show_unused),
        }
    }
}

/// YAML file backed store. A missing file yields the defaults.
pub struct YamlFilterStore {
    path: PathBuf,
}

impl YamlFilterStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl FilterStore for YamlFilterStore {
    fn load(&self) -> Result<FilterState, PrefsError> {
        if !self.path.exists() {
            return Ok(FilterState::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(FilterState::default());
        }
        let stored: StoredPrefs = serde_yaml::from_str(&content)?;
        Ok(stored.into_filter())
    }

    fn save(&self, filter: &FilterState) -> Result<(), PrefsError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_yaml::to_string(&StoredPrefs::from_filter(filter))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Keeps the filter in memory only.
#[derive(Default)]
pub struct MemoryFilterStore {
    saved: Mutex<Option<FilterState>>,
}

impl MemoryFilterStore {
    pub fn saved(&self) -> Option<FilterState> {
        self.saved.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl FilterStore for MemoryFilterStore {
    fn load(&self) -> Result<FilterState, PrefsError> {
        Ok(self.saved().unwrap_or_default())
    }

    fn save(&self, filter: &FilterState) -> Result<(), PrefsError> {
        *self.saved.lock().unwrap_or_else(|e| e.into_inner()) = Some(filter.clone());
        Ok(())
    }
}
