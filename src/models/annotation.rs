//! Results produced by annotating a route with weather

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::time_format::hour_minute;
use super::{Forecast, LatLng};

/// A city discovered along the routed path, not specified by the user
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntermediateCity {
    pub city: String,
    /// Local date the route passes the city
    pub date: NaiveDate,
    /// Local time the route passes the city
    #[serde(with = "hour_minute")]
    pub pass_by_time: NaiveTime,
    /// Canonical city center, as reported by the geocoder
    pub lat: f64,
    pub lon: f64,
    /// Full forecast for the city center, kept for replay
    pub forecast: Forecast,
}

impl IntermediateCity {
    #[must_use]
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lon)
    }
}

/// Everything a completed generation reports back
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteOutcome {
    /// Rounded kilometers
    pub distance_km: u64,
    /// `"{h}h {m}min"`
    pub estimated_time: String,
    pub intermediate_cities: Vec<IntermediateCity>,
    /// Most frequent weather description, title-cased; `None` when no point
    /// had weather data
    pub dominant_weather: Option<String>,
}

/// How a call to the planner ended
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    /// The request had no waypoints
    Empty,
    /// A newer generation started before this one finished
    Superseded,
    Completed(RouteOutcome),
}

impl GenerationOutcome {
    #[must_use]
    pub fn completed(self) -> Option<RouteOutcome> {
        match self {
            GenerationOutcome::Completed(outcome) => Some(outcome),
            _ => None,
        }
    }
}
