//! `RouteCast` - weather-annotated road trip planning
//!
//! This library routes a list of stops, discovers the cities passed on the
//! way and attaches the forecast for the moment each point is reached.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod generation;
pub mod geo;
pub mod map_view;
pub mod models;
pub mod pipeline;
pub mod planning;
pub mod services;
pub mod throttle;
pub mod units;
pub mod web;

// Re-export core types for public API
pub use config::RouteCastConfig;
pub use error::RouteCastError;
pub use generation::{GenerationCounter, GenerationToken};
pub use map_view::{InMemoryMap, MapSurface, MapViewState, Marker, MarkerKind, Popup, StopKind};
pub use models::{
    Forecast, ForecastSample, GenerationOutcome, IntermediateCity, LatLng, RouteOutcome,
    RouteRequest, RoutedPath, Waypoint,
};
pub use pipeline::{PlannerOptions, RoutePlanner};
pub use services::{
    CurrentWeatherProvider, ForecastProvider, ForecastQuery, ReverseGeocoder, ReversePlace,
    RoutingService,
};
pub use throttle::{Throttle, ThrottlePolicy};
pub use units::Units;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, RouteCastError>;
