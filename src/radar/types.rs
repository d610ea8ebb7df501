use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Satellite navigation system family.
///
/// Numeric codes follow the Android `GnssStatus` constellation constants,
/// which is also the representation used by the preferences file.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    strum_macros::Display,
    strum_macros::AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Constellation {
    Gps,
    Glonass,
    Galileo,
    Beidou,
    Unknown,
}

impl Constellation {
    /// Constellations the user can enable, in settings order.
    pub const KNOWN: [Constellation; 4] = [
        Constellation::Gps,
        Constellation::Galileo,
        Constellation::Glonass,
        Constellation::Beidou,
    ];

    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Constellation::Gps,
            3 => Constellation::Glonass,
            5 => Constellation::Beidou,
            6 => Constellation::Galileo,
            _ => Constellation::Unknown,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Constellation::Gps => 1,
            Constellation::Glonass => 3,
            Constellation::Beidou => 5,
            Constellation::Galileo => 6,
            Constellation::Unknown => 0,
        }
    }

    /// Three letter label drawn next to markers.
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Constellation::Gps => "GPS",
            Constellation::Glonass => "GLO",
            Constellation::Galileo => "GAL",
            Constellation::Beidou => "BDS",
            Constellation::Unknown => "UNK",
        }
    }

    /// Human readable name used in the settings form.
    pub fn display_name(&self) -> &'static str {
        match self {
            Constellation::Gps => "GPS",
            Constellation::Glonass => "Glonass",
            Constellation::Galileo => "Galileo",
            Constellation::Beidou => "Beidou",
            Constellation::Unknown => "Unknown",
        }
    }

    /// Base name of the icon file, e.g. `gps` for `gps.png`.
    pub fn icon_name(&self) -> &'static str {
        match self {
            Constellation::Gps => "gps",
            Constellation::Glonass => "glonass",
            Constellation::Galileo => "galileo",
            Constellation::Beidou => "beidou",
            Constellation::Unknown => "unknown",
        }
    }
}

/// Satellite tuple as reported by a status source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RawSatellite {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub svid: u32,
    /// Android `GnssStatus` constellation code.
    pub constellation: i32,
    pub used_in_fix: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SatelliteRecord {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub svid: u32,
    pub constellation: Constellation,
    pub used_in_fix: bool,
}

impl From<&RawSatellite> for SatelliteRecord {
    fn from(raw: &RawSatellite) -> Self {
        Self {
            azimuth_deg: raw.azimuth_deg,
            elevation_deg: raw.elevation_deg,
            svid: raw.svid,
            constellation: Constellation::from_code(raw.constellation),
            used_in_fix: raw.used_in_fix,
        }
    }
}
