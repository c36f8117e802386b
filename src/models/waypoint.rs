//! User-specified stops and the route request built from them

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::time_format::{forecast_stamps, hour_minute_opt};
use super::{Forecast, ForecastSample, IntermediateCity, LatLng};

/// A stop the user put on the route.
///
/// The forecast is kept as parallel arrays: index `i` of `dates`,
/// `temperature`, `humidity`, `wind_speed`, `wind_direction` and
/// `weather_description` all describe the same instant.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub city: String,
    pub lat: f64,
    pub lon: f64,
    /// Travel date (local)
    pub date: NaiveDate,
    /// Local departure time, only meaningful on the first stop
    #[serde(default, with = "hour_minute_opt")]
    pub departure_time: Option<NaiveTime>,
    #[serde(default, with = "forecast_stamps")]
    pub dates: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub temperature: Vec<f64>,
    #[serde(default)]
    pub humidity: Vec<u8>,
    #[serde(default)]
    pub wind_speed: Vec<f64>,
    #[serde(default)]
    pub wind_direction: Vec<u16>,
    #[serde(default)]
    pub weather_description: Vec<String>,
}

impl Waypoint {
    /// Stop without forecast data
    #[must_use]
    pub fn new(city: impl Into<String>, position: LatLng, date: NaiveDate) -> Self {
        Self::from_forecast(city.into(), position, date, None, &Forecast::default())
    }

    /// Build a stop from a forecast lookup for that city
    #[must_use]
    pub fn from_forecast(
        city: String,
        position: LatLng,
        date: NaiveDate,
        departure_time: Option<NaiveTime>,
        forecast: &Forecast,
    ) -> Self {
        let samples = &forecast.samples;
        Self {
            city,
            lat: position.lat,
            lon: position.lon,
            date,
            departure_time,
            dates: samples.iter().map(|s| s.timestamp).collect(),
            temperature: samples.iter().map(|s| s.temperature).collect(),
            humidity: samples.iter().map(|s| s.humidity).collect(),
            wind_speed: samples.iter().map(|s| s.wind_speed).collect(),
            wind_direction: samples.iter().map(|s| s.wind_direction).collect(),
            weather_description: samples.iter().map(|s| s.description.clone()).collect(),
        }
    }

    #[must_use]
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lon)
    }

    /// Reassemble sample `index` from the parallel arrays.
    ///
    /// Returns `None` when any of the arrays is too short to describe it.
    #[must_use]
    pub fn forecast_sample(&self, index: usize) -> Option<ForecastSample> {
        Some(ForecastSample {
            timestamp: *self.dates.get(index)?,
            temperature: *self.temperature.get(index)?,
            humidity: *self.humidity.get(index)?,
            wind_speed: *self.wind_speed.get(index)?,
            wind_direction: *self.wind_direction.get(index)?,
            description: self.weather_description.get(index)?.clone(),
        })
    }

    /// Lower-cased, trimmed city name; empty when the stop has no name
    #[must_use]
    pub fn city_key(&self) -> String {
        self.city.trim().to_lowercase()
    }
}

/// Ordered stops plus optionally the intermediate cities of an earlier run
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    pub points: Vec<Waypoint>,
    /// Cached discovery results; when present the route is redisplayed
    /// without geocoding or forecast calls
    #[serde(default)]
    pub inbetween_points: Option<Vec<IntermediateCity>>,
}

impl RouteRequest {
    #[must_use]
    pub fn new(points: Vec<Waypoint>) -> Self {
        Self {
            points,
            inbetween_points: None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Names of the user's own stops, used to keep them out of discovery
    #[must_use]
    pub fn user_city_keys(&self) -> HashSet<String> {
        self.points
            .iter()
            .map(Waypoint::city_key)
            .filter(|name| !name.is_empty())
            .collect()
    }

    #[must_use]
    pub fn positions(&self) -> Vec<LatLng> {
        self.points.iter().map(Waypoint::position).collect()
    }
}
