//! Unit conversion and compass helpers for weather popups

use serde::{Deserialize, Serialize};

/// Display unit system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

impl Units {
    /// Temperature from Celsius, whole degrees Fahrenheit in imperial
    #[must_use]
    pub fn temperature(self, celsius: f64) -> f64 {
        match self {
            Units::Metric => celsius,
            Units::Imperial => (celsius * 9.0 / 5.0 + 32.0).round(),
        }
    }

    /// Wind speed from the provider's m/s, as km/h or mph (one decimal)
    #[must_use]
    pub fn wind_speed(self, meters_per_second: f64) -> f64 {
        let kmh = meters_per_second * 3.6;
        match self {
            Units::Metric => (kmh * 10.0).round() / 10.0,
            Units::Imperial => (kmh * 0.621_371 * 10.0).round() / 10.0,
        }
    }

    #[must_use]
    pub fn temperature_label(self) -> &'static str {
        match self {
            Units::Metric => "C",
            Units::Imperial => "F",
        }
    }

    #[must_use]
    pub fn speed_label(self) -> &'static str {
        match self {
            Units::Metric => "km/h",
            Units::Imperial => "mp/h",
        }
    }
}

impl std::str::FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            other => Err(format!("unknown unit system '{other}'")),
        }
    }
}

/// 16-point compass direction for a bearing in degrees
#[must_use]
pub fn compass_point(degrees: u16) -> &'static str {
    let index = (f64::from(degrees) / 22.5).round() as usize % COMPASS_POINTS.len();
    COMPASS_POINTS[index]
}
