//! Forecast samples and nearest-instant matching

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::LatLng;

/// One timestamped entry from a forecast service response
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ForecastSample {
    /// Instant this sample describes
    pub timestamp: DateTime<Utc>,
    /// Temperature in Celsius
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: u8,
    /// Wind speed as reported by the provider (metric units)
    pub wind_speed: f64,
    /// Wind direction in degrees (0-360, where 0/360 is North)
    pub wind_direction: u16,
    /// Human-readable description of weather conditions, e.g. "light rain"
    pub description: String,
}

/// The place a forecast was issued for
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ForecastCity {
    pub name: String,
    pub coord: LatLng,
}

/// Conditions reported right now for one place
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CurrentWeather {
    pub city: ForecastCity,
    pub conditions: ForecastSample,
}

/// Ordered forecast for one place
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Forecast {
    /// Canonical place, when the provider reports one
    pub city: Option<ForecastCity>,
    /// Samples sorted by timestamp
    pub samples: Vec<ForecastSample>,
}

impl Forecast {
    #[must_use]
    pub fn new(city: Option<ForecastCity>, samples: Vec<ForecastSample>) -> Self {
        Self { city, samples }
    }

    /// Sample closest to `target`, if one lies within `tolerance`
    #[must_use]
    pub fn nearest(&self, target: DateTime<Utc>, tolerance: Duration) -> Option<&ForecastSample> {
        nearest_sample(&self.samples, target, tolerance)
    }

    /// Like [`Forecast::nearest`], but on equal distance the earlier sample
    /// wins. Used when redisplaying stored pass-by cities.
    #[must_use]
    pub fn nearest_earliest(
        &self,
        target: DateTime<Utc>,
        tolerance: Duration,
    ) -> Option<&ForecastSample> {
        // Strict comparison against a bound 1 ms past the tolerance keeps
        // samples exactly `tolerance` away eligible
        let mut smallest = tolerance + Duration::milliseconds(1);
        let mut best = None;

        for sample in &self.samples {
            let diff = (sample.timestamp - target).abs();
            if diff < smallest {
                smallest = diff;
                best = Some(sample);
            }
        }

        best
    }
}

/// Pick the sample whose timestamp is closest to `target`.
///
/// Samples further than `tolerance` away never qualify. On equal distance the
/// later sample in the slice wins.
#[must_use]
pub fn nearest_sample(
    samples: &[ForecastSample],
    target: DateTime<Utc>,
    tolerance: Duration,
) -> Option<&ForecastSample> {
    let mut best = None;
    let mut smallest = tolerance;

    for sample in samples {
        let diff = (sample.timestamp - target).abs();
        if diff <= smallest {
            smallest = diff;
            best = Some(sample);
        }
    }

    best
}
