//! In-process stand-ins for the routing, geocoding and forecast services
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

use routecast::models::{CurrentWeather, ForecastCity, Instruction, RouteSummary};
use routecast::{
    CurrentWeatherProvider, Forecast, ForecastProvider, ForecastQuery, ForecastSample, LatLng, ReverseGeocoder,
    ReversePlace, RouteCastError, RoutedPath, RoutingService, Waypoint,
};

/// Latitude step of the test polylines, about 10.01 km
pub const STEP_DEG: f64 = 0.09;

/// Polyline running north along the prime meridian from the equator
pub fn meridian(points: usize) -> Vec<LatLng> {
    (0..points)
        .map(|i| LatLng::new(i as f64 * STEP_DEG, 0.0))
        .collect()
}

/// Index of a meridian point
pub fn point_index(point: LatLng) -> usize {
    (point.lat / STEP_DEG).round() as usize
}

pub fn trip_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

pub fn utc(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, hour, minute, 0).unwrap()
}

pub fn sample(at: DateTime<Utc>, description: &str) -> ForecastSample {
    ForecastSample {
        timestamp: at,
        temperature: 18.0,
        humidity: 55,
        wind_speed: 4.0,
        wind_direction: 225,
        description: description.to_string(),
    }
}

/// A stop on 2024-06-01 carrying `samples` as its forecast
pub fn waypoint(
    city: &str,
    position: LatLng,
    departure: Option<(u32, u32)>,
    samples: Vec<ForecastSample>,
) -> Waypoint {
    Waypoint::from_forecast(
        city.to_string(),
        position,
        trip_date(),
        departure.and_then(|(h, m)| NaiveTime::from_hms_opt(h, m, 0)),
        &Forecast::new(None, samples),
    )
}

pub fn routed_path(
    coordinates: Vec<LatLng>,
    total_distance_m: f64,
    total_time_s: f64,
    waypoint_indices: Vec<usize>,
    instructions: &[(usize, f64)],
) -> RoutedPath {
    RoutedPath {
        coordinates,
        summary: RouteSummary {
            total_distance: total_distance_m,
            total_time: total_time_s,
        },
        waypoint_indices,
        instructions: instructions
            .iter()
            .map(|&(index, time)| Instruction { index, time })
            .collect(),
    }
}

/// Routes everything onto the same path; routes starting beyond 80°N fail
pub struct MockRouter {
    paths: Mutex<Vec<RoutedPath>>,
    pub calls: AtomicUsize,
}

impl MockRouter {
    pub fn new(path: RoutedPath) -> Self {
        Self {
            paths: Mutex::new(vec![path]),
            calls: AtomicUsize::new(0),
        }
    }

    /// Serve `path` from now on
    pub fn set_path(&self, path: RoutedPath) {
        *self.paths.lock().unwrap() = vec![path];
    }
}

#[async_trait]
impl RoutingService for MockRouter {
    async fn route(&self, waypoints: &[LatLng]) -> routecast::Result<Vec<RoutedPath>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if waypoints.first().is_some_and(|p| p.lat > 80.0) {
            return Err(RouteCastError::routing("NoRoute: Impossible route"));
        }
        Ok(self.paths.lock().unwrap().clone())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum GeoAnswer {
    City(&'static str),
    Nothing,
    Fail,
}

/// Answers by meridian point index; unknown points have no locality
pub struct MockGeocoder {
    answers: HashMap<usize, GeoAnswer>,
    delay: Duration,
    pub calls: Mutex<Vec<tokio::time::Instant>>,
}

impl MockGeocoder {
    pub fn new(answers: &[(usize, GeoAnswer)]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ReverseGeocoder for MockGeocoder {
    async fn reverse_geocode(&self, point: LatLng) -> routecast::Result<Option<ReversePlace>> {
        self.calls.lock().unwrap().push(tokio::time::Instant::now());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.answers.get(&point_index(point)) {
            Some(GeoAnswer::City(name)) => Ok(Some(ReversePlace {
                city: Some((*name).to_string()),
                center: point,
            })),
            Some(GeoAnswer::Fail) => Err(RouteCastError::api("Nominatim request failed with status 503")),
            Some(GeoAnswer::Nothing) | None => Ok(None),
        }
    }
}

/// Same forecast for every coordinate; known cities by name
pub struct MockForecasts {
    samples: Vec<ForecastSample>,
    failing: HashSet<usize>,
    pub queries: Mutex<Vec<ForecastQuery>>,
}

impl MockForecasts {
    pub fn new(samples: Vec<ForecastSample>) -> Self {
        Self {
            samples,
            failing: HashSet::new(),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Fail lookups for the meridian point at `index`
    #[must_use]
    pub fn failing_at(mut self, index: usize) -> Self {
        self.failing.insert(index);
        self
    }

    pub fn call_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

impl MockForecasts {
    /// City a query names, or `None` for coordinate lookups
    fn resolve(&self, query: &ForecastQuery) -> routecast::Result<Option<ForecastCity>> {
        let key = match query {
            ForecastQuery::Coordinates(point) => {
                if self.failing.contains(&point_index(*point)) {
                    return Err(RouteCastError::api("OpenWeatherMap request failed with status 500"));
                }
                return Ok(None);
            }
            ForecastQuery::City(name) => name.trim().to_lowercase(),
            ForecastQuery::Id(id) => match id.trim() {
                "2643743" => "london".to_string(),
                "2988507" => "paris".to_string(),
                "2996944" => "lyon".to_string(),
                _ => return Err(RouteCastError::api("OpenWeatherMap found nothing for this request")),
            },
        };
        let (canonical, coord) = match key.as_str() {
            "london" => ("London", LatLng::new(51.5085, -0.1257)),
            "paris" => ("Paris", LatLng::new(48.8534, 2.3488)),
            "lyon" => ("Lyon", LatLng::new(45.7485, 4.8467)),
            _ => return Err(RouteCastError::api("OpenWeatherMap found nothing for this request")),
        };
        Ok(Some(ForecastCity {
            name: canonical.to_string(),
            coord,
        }))
    }
}

#[async_trait]
impl ForecastProvider for MockForecasts {
    async fn forecast(&self, query: &ForecastQuery) -> routecast::Result<Forecast> {
        self.queries.lock().unwrap().push(query.clone());
        let city = self.resolve(query)?;
        Ok(Forecast::new(city, self.samples.clone()))
    }
}

#[async_trait]
impl CurrentWeatherProvider for MockForecasts {
    async fn current_weather(&self, query: &ForecastQuery) -> routecast::Result<CurrentWeather> {
        self.queries.lock().unwrap().push(query.clone());
        let city = self.resolve(query)?.unwrap_or_else(|| ForecastCity {
            name: String::new(),
            coord: LatLng::new(0.0, 0.0),
        });
        let conditions = self
            .samples
            .first()
            .cloned()
            .ok_or_else(|| RouteCastError::api("OpenWeatherMap returned no conditions"))?;
        Ok(CurrentWeather { city, conditions })
    }
}
