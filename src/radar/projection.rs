use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Elevation to radius mapping.
///
/// `Cosine` places a satellite at `R * cos(el)`, which is the orthographic
/// view of the sky dome. `Linear` spaces elevation rings evenly,
/// `R * (1 - el / 90)`. Both put the zenith at the centre and the horizon on
/// the rim but differ for mid elevations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    #[default]
    Cosine,
    Linear,
}

impl Projection {
    /// Distance from the centre for an elevation, on a disk of `radius`.
    pub fn radial_distance(&self, elevation_deg: f64, radius: f64) -> f64 {
        let el = clamp_elevation(elevation_deg);
        match self {
            Projection::Cosine => radius * el.to_radians().cos().max(0.0),
            Projection::Linear => radius * (1.0 - el / 90.0),
        }
    }

    /// Offset `(x, y)` from the disk centre in screen coordinates (y grows
    /// downward): azimuth 0 points up, azimuth 90 points right.
    pub fn project(&self, elevation_deg: f64, azimuth_deg: f64, radius: f64) -> (f64, f64) {
        let r = self.radial_distance(elevation_deg, radius);
        let az = normalize_azimuth(azimuth_deg).to_radians();
        (r * az.sin(), -r * az.cos())
    }
}

pub fn clamp_elevation(elevation_deg: f64) -> f64 {
    if elevation_deg.is_finite() {
        elevation_deg.clamp(0.0, 90.0)
    } else {
        0.0
    }
}

pub fn normalize_azimuth(azimuth_deg: f64) -> f64 {
    if azimuth_deg.is_finite() {
        azimuth_deg.rem_euclid(360.0)
    } else {
        0.0
    }
}
