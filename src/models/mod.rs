//! Data models for `RouteCast`
//!
//! - Location: map coordinates
//! - Waypoint: user stops and the route request
//! - Route: routing service results
//! - Forecast: forecast samples and nearest-instant matching
//! - Annotation: discovered cities and generation outcomes

pub mod annotation;
pub mod forecast;
pub mod location;
pub mod route;
pub mod time_format;
pub mod waypoint;

pub use annotation::{GenerationOutcome, IntermediateCity, RouteOutcome};
pub use forecast::{CurrentWeather, Forecast, ForecastCity, ForecastSample, nearest_sample};
pub use location::LatLng;
pub use route::{Instruction, RouteSummary, RoutedPath};
pub use waypoint::{RouteRequest, Waypoint};
