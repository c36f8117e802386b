//! Geographic coordinate model

use serde::{Deserialize, Serialize};

/// A point on the map in decimal degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct LatLng {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    #[serde(alias = "lng")]
    pub lon: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Format as a coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.lat, self.lon)
    }

    /// Round coordinates for cache key generation
    #[must_use]
    pub fn rounded_coordinates(&self, precision: u32) -> (f64, f64) {
        let multiplier = 10_f64.powi(i32::try_from(precision).unwrap_or(4));
        let lat = (self.lat * multiplier).round() / multiplier;
        let lon = (self.lon * multiplier).round() / multiplier;
        (lat, lon)
    }

    /// Cache key for lookups bound to this position
    #[must_use]
    pub fn cache_key(&self, prefix: &str) -> String {
        let (lat, lon) = self.rounded_coordinates(2);
        format!("{prefix}:{lat:.2}:{lon:.2}")
    }
}

impl From<LatLng> for haversine::Location {
    fn from(point: LatLng) -> Self {
        haversine::Location {
            latitude: point.lat,
            longitude: point.lon,
        }
    }
}
