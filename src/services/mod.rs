//! External collaborators: routing, reverse geocoding and weather
//!
//! Each collaborator is a trait so the planner can run against the real HTTP
//! clients in production and in-process fakes in tests. Wire formats are
//! parsed into explicit schemas at the boundary; anything that does not fit
//! becomes a [`RouteCastError::Parse`](crate::RouteCastError::Parse).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ServicesConfig;
use crate::models::{CurrentWeather, Forecast, LatLng, RoutedPath};
use crate::{Result, RouteCastError};

pub mod cached;
pub mod nominatim;
pub mod openweathermap;
pub mod osrm;

pub use cached::CachedForecastProvider;
pub use nominatim::NominatimClient;
pub use openweathermap::OpenWeatherMapClient;
pub use osrm::OsrmClient;

/// Computes a road route through an ordered list of waypoints
#[async_trait]
pub trait RoutingService: Send + Sync {
    /// Route alternatives, best first
    async fn route(&self, waypoints: &[LatLng]) -> Result<Vec<RoutedPath>>;
}

/// Locality found for a coordinate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReversePlace {
    /// City name, absent when the point is not inside a city
    pub city: Option<String>,
    /// Center of the matched place
    pub center: LatLng,
}

/// Maps a coordinate to the place it lies in
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// `Ok(None)` means the service answered but found nothing there
    async fn reverse_geocode(&self, point: LatLng) -> Result<Option<ReversePlace>>;
}

/// What to fetch weather for
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastQuery {
    City(String),
    /// Provider-specific place id, such as an OpenWeatherMap city id
    Id(String),
    Coordinates(LatLng),
}

impl ForecastQuery {
    /// Key used when memoising this query
    #[must_use]
    pub fn cache_key(&self) -> String {
        match self {
            ForecastQuery::City(name) => format!("forecast:city:{}", name.trim().to_lowercase()),
            ForecastQuery::Id(id) => format!("forecast:id:{}", id.trim()),
            ForecastQuery::Coordinates(point) => point.cache_key("forecast"),
        }
    }
}

/// Supplies timestamped forecasts
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    async fn forecast(&self, query: &ForecastQuery) -> Result<Forecast>;
}

/// Supplies the conditions at a place right now
#[async_trait]
pub trait CurrentWeatherProvider: Send + Sync {
    async fn current_weather(&self, query: &ForecastQuery) -> Result<CurrentWeather>;
}

#[async_trait]
impl<T: RoutingService + ?Sized> RoutingService for Arc<T> {
    async fn route(&self, waypoints: &[LatLng]) -> Result<Vec<RoutedPath>> {
        (**self).route(waypoints).await
    }
}

#[async_trait]
impl<T: ReverseGeocoder + ?Sized> ReverseGeocoder for Arc<T> {
    async fn reverse_geocode(&self, point: LatLng) -> Result<Option<ReversePlace>> {
        (**self).reverse_geocode(point).await
    }
}

#[async_trait]
impl<T: ForecastProvider + ?Sized> ForecastProvider for Arc<T> {
    async fn forecast(&self, query: &ForecastQuery) -> Result<Forecast> {
        (**self).forecast(query).await
    }
}

#[async_trait]
impl<T: CurrentWeatherProvider + ?Sized> CurrentWeatherProvider for Arc<T> {
    async fn current_weather(&self, query: &ForecastQuery) -> Result<CurrentWeather> {
        (**self).current_weather(query).await
    }
}

/// HTTP client shared by the service clients
pub fn http_client(config: &ServicesConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds.into()))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| RouteCastError::config(format!("Failed to create HTTP client: {e}")))
}

/// Turn non-success statuses into API errors
pub(crate) async fn ensure_success(response: Response, service: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!("{} request failed with HTTP {}", service, status);

    let message = match status {
        StatusCode::UNAUTHORIZED => format!("{service} rejected the API key"),
        StatusCode::NOT_FOUND => format!("{service} found nothing for this request"),
        StatusCode::TOO_MANY_REQUESTS => format!("{service} rate limit exceeded"),
        _ => format!(
            "{service} request failed with status {} - {}",
            status,
            body.chars().take(200).collect::<String>()
        ),
    };
    Err(RouteCastError::api(message))
}
