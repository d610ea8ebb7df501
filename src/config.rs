use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::radar::{Projection, DEFAULT_INTERVAL, DEFAULT_STEP_DEG};
use crate::render::{Color, RenderOptions};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub radar: RadarConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub preferences: PreferencesConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub api_keys: Vec<ApiKey>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RadarConfig {
    pub projection: Projection,
    pub used_color: String,
    pub unused_color: String,
    pub label_constellation: bool,
    pub icons_dir: Option<PathBuf>,
    pub icon_size: f32,
    pub width: u32,
    pub height: u32,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            projection: Projection::default(),
            used_color: "#4CAF50".to_string(),
            unused_color: "#888888".to_string(),
            label_constellation: false,
            icons_dir: None,
            icon_size: 55.0,
            width: 800,
            height: 800,
        }
    }
}

impl RadarConfig {
    pub fn render_options(&self) -> Result<RenderOptions, ConfigError> {
        let color = |field: &'static str, value: &str| {
            Color::from_hex(value).ok_or_else(|| ConfigError::Invalid {
                field,
                message: format!("'{}' is not a #RRGGBB or #AARRGGBB color", value),
            })
        };
        if self.icon_size.is_nan() || self.icon_size <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "radar.icon_size",
                message: format!("{} must be positive", self.icon_size),
            });
        }
        Ok(RenderOptions {
            projection: self.projection,
            used_color: color("radar.used_color", &self.used_color)?,
            unused_color: color("radar.unused_color", &self.unused_color)?,
            label_constellation: self.label_constellation,
            draw_icons: self.icons_dir.is_some(),
            icon_size: self.icon_size,
            ..RenderOptions::default()
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub step_deg: f64,
    #[serde(deserialize_with = "humantime_duration")]
    pub interval: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            step_deg: DEFAULT_STEP_DEG,
            interval: DEFAULT_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreferencesConfig {
    #[serde(default = "default_preferences_path")]
    pub path: PathBuf,
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            path: default_preferences_path(),
        }
    }
}

fn default_preferences_path() -> PathBuf {
    PathBuf::from("radar-preferences.yaml")
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedConfig {
    pub nmea: Option<NmeaFeedConfig>,
    pub simulation: Option<SimulationConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NmeaFeedConfig {
    /// Log file to replay, or `-` for stdin.
    pub path: String,
    #[serde(default, deserialize_with = "humantime_duration")]
    pub epoch_interval: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    pub tle_folder: PathBuf,
    pub station: StationConfig,
    #[serde(
        default = "default_simulation_interval",
        deserialize_with = "humantime_duration"
    )]
    pub interval: Duration,
    #[serde(default = "default_fix_mask")]
    pub fix_mask_deg: f64,
}

fn default_simulation_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_fix_mask() -> f64 {
    15.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    pub name: Option<String>,
    pub coordinates: String,
    #[serde(default)]
    pub altitude_m: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKey {
    pub key: String,
    pub name: String,
    pub permissions: HashSet<Permission>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, strum_macros::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Permission {
    PushStatus,
    Configure,
}

fn humantime_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.sweep.step_deg.is_finite() {
            return Err(ConfigError::Invalid {
                field: "sweep.step_deg",
                message: "must be a finite number".to_string(),
            });
        }
        if self.sweep.interval.is_zero() {
            return Err(ConfigError::Invalid {
                field: "sweep.interval",
                message: "must be greater than zero".to_string(),
            });
        }
        self.radar.render_options()?;
        Ok(())
    }

    pub fn find_api_key(&self, key: &str) -> Option<&ApiKey> {
        self.api_keys.iter().find(|k| k.key == key)
    }
}

#[cfg(test)]
mod test {
    use super::{Config, ConfigError, Permission};
    use crate::radar::Projection;
    use crate::render::Color;
    use std::time::Duration;

    const SAMPLE: &str = r##"
web:
  bind: "127.0.0.1:9000"
radar:
  projection: linear
  used_color: "#00FF00"
  label_constellation: true
  icons_dir: icons
sweep:
  step_deg: 6
  interval: 50ms
preferences:
  path: /tmp/prefs.yaml
feed:
  nmea:
    path: "-"
    epoch_interval: 1s
  simulation:
    tle_folder: tles
    station:
      coordinates: "52.0, 4.3"
      altitude_m: 10
api_keys:
  - key: secret
    name: phone
    permissions: [push_status]
"##;

    #[test]
    fn parses_full_config() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.web.bind, "127.0.0.1:9000");
        assert_eq!(config.radar.projection, Projection::Linear);
        assert_eq!(config.sweep.interval, Duration::from_millis(50));
        assert_eq!(config.sweep.step_deg, 6.0);

        let nmea = config.feed.nmea.as_ref().unwrap();
        assert_eq!(nmea.path, "-");
        assert_eq!(nmea.epoch_interval, Duration::from_secs(1));
        let sim = config.feed.simulation.as_ref().unwrap();
        assert_eq!(sim.interval, Duration::from_secs(1));
        assert_eq!(sim.fix_mask_deg, 15.0);

        let key = config.find_api_key("secret").unwrap();
        assert!(key.permissions.contains(&Permission::PushStatus));
        assert!(!key.permissions.contains(&Permission::Configure));
        assert!(config.find_api_key("nope").is_none());

        let options = config.radar.render_options().unwrap();
        assert_eq!(options.used_color, Color::rgb(0, 255, 0));
        assert!(options.draw_icons);
        assert!(options.label_constellation);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.web.bind, "0.0.0.0:8080");
        assert_eq!(config.radar.projection, Projection::Cosine);
        assert_eq!(config.sweep.interval, Duration::from_millis(30));
        assert!(config.feed.nmea.is_none());
        assert!(config.api_keys.is_empty());
    }

    #[test]
    fn rejects_bad_values() {
        let bad_color = Config::from_yaml("radar:\n  used_color: green\n");
        assert!(matches!(
            bad_color,
            Err(ConfigError::Invalid {
                field: "radar.used_color",
                ..
            })
        ));
        let zero = Config::from_yaml("sweep:\n  interval: 0s\n");
        assert!(matches!(zero, Err(ConfigError::Invalid { .. })));
        assert!(matches!(
            Config::from_yaml("sweep:\n  interval: soon\n"),
            Err(ConfigError::Yaml(_))
        ));
    }
}
