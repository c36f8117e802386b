//! Route annotation pipeline
//!
//! [`RoutePlanner::generate`] routes the user's stops, attaches a forecast to
//! every stop for its arrival time, discovers the cities passed on the way
//! (or replays the ones found earlier) and reports distance, duration and the
//! dominant weather.

pub mod discovery;
pub mod orchestrator;
pub mod stats;
pub mod timing;

pub use discovery::is_administrative;
pub use orchestrator::{PlannerOptions, RoutePlanner};
pub use stats::{DescriptionTally, title_case};
pub use timing::format_duration;
