use chrono::{DateTime, Utc};
use sgp4::{Constants, Elements};

use super::error::FeedError;

/// WGS-84 position of the simulated receiver.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroundStation {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

/// Direction to a satellite as seen from the station.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookAngles {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub range_km: f64,
}

impl GroundStation {
    /// Parses `"lat, lon"` in decimal degrees.
    pub fn from_coordinates(coordinates: &str, altitude_m: f64) -> Result<Self, FeedError> {
        let invalid = || FeedError::InvalidStation(coordinates.to_string());
        let (lat, lon) = coordinates.split_once(',').ok_or_else(invalid)?;
        let latitude_deg: f64 = lat.trim().parse().map_err(|_| invalid())?;
        let longitude_deg: f64 = lon.trim().parse().map_err(|_| invalid())?;
        if !(-90.0..=90.0).contains(&latitude_deg) || !(-180.0..=180.0).contains(&longitude_deg) {
            return Err(invalid());
        }
        Ok(Self {
            latitude_deg,
            longitude_deg,
            altitude_m,
        })
    }

    fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }

    pub fn position_ecef_km(&self) -> [f64; 3] {
        // WGS-84
        let a = 6378.137;
        let e2 = 0.00669437999014;
        let (sin_lat, cos_lat) = self.lat_rad().sin_cos();
        let (sin_lon, cos_lon) = self.lon_rad().sin_cos();
        let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let alt_km = self.altitude_m / 1000.0;
        [
            (n + alt_km) * cos_lat * cos_lon,
            (n + alt_km) * cos_lat * sin_lon,
            (n * (1.0 - e2) + alt_km) * sin_lat,
        ]
    }

    /// Azimuth/elevation of `sat_ecef` (km).
    pub fn look_at(&self, sat_ecef: [f64; 3]) -> LookAngles {
        let sta = self.position_ecef_km();
        let dr = [sat_ecef[0] - sta[0], sat_ecef[1] - sta[1], sat_ecef[2] - sta[2]];
        let range_km = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();
        let (east, north, up) = ecef_to_enu(dr, self.lat_rad(), self.lon_rad());
        let elevation_deg = if range_km > 0.0 {
            (up / range_km).asin().to_degrees()
        } else {
            0.0
        };
        LookAngles {
            azimuth_deg: east.atan2(north).to_degrees().rem_euclid(360.0),
            elevation_deg,
            range_km,
        }
    }

    /// Propagates one TLE to `timestamp` and looks at it.
    pub fn observe(
        &self,
        elements: &Elements,
        constants: &Constants,
        timestamp: DateTime<Utc>,
    ) -> Result<LookAngles, FeedError> {
        let minutes = elements
            .datetime_to_minutes_since_epoch(&timestamp.naive_utc())
            .map_err(|e| FeedError::Propagation(e.to_string()))?;
        let prediction = constants.propagate(minutes)?;
        let sidereal = sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(
            &timestamp.naive_utc(),
        ));
        Ok(self.look_at(teme_to_ecef(prediction.position, sidereal)))
    }
}

pub fn teme_to_ecef(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let (sin_gmst, cos_gmst) = gmst.sin_cos();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let (sin_lat, cos_lat) = lat_rad.sin_cos();
    let (sin_lon, cos_lon) = lon_rad.sin_cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}
