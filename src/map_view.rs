//! Map display state owned by the route planner
//!
//! The planner never talks to a map directly. It goes through
//! [`MapViewState`], which remembers what the current generation put on the
//! surface so it can be cleared wholesale, and refuses writes from stale
//! generations.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::generation::GenerationToken;
use crate::models::{ForecastSample, LatLng};
use crate::units::{Units, compass_point};

pub type MarkerId = u64;

/// Icon used for a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerKind {
    /// A stop the user entered
    Waypoint,
    /// A discovered city the route passes by
    PassBy,
}

/// Role of the point in the trip, shown as the popup heading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopKind {
    Departure,
    Stop,
    Arrival,
    PassBy,
}

impl StopKind {
    /// Kind of the waypoint at `index` in a route of `count` waypoints
    #[must_use]
    pub fn for_waypoint(index: usize, count: usize) -> Self {
        if index == 0 {
            StopKind::Departure
        } else if index + 1 == count {
            StopKind::Arrival
        } else {
            StopKind::Stop
        }
    }

    #[must_use]
    pub fn heading(self) -> &'static str {
        match self {
            StopKind::Departure => "Departure",
            StopKind::Stop => "Stop",
            StopKind::Arrival => "Arrival",
            StopKind::PassBy => "Pass By",
        }
    }
}

/// Popup attached to a marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Popup {
    pub title: String,
    pub stop: StopKind,
    /// Local date, `DD/MM/YYYY`
    pub date: String,
    /// Local time, `HH:MM`
    pub time: String,
    /// Matched forecast; `None` renders as "No Weather Data"
    pub weather: Option<ForecastSample>,
}

impl Popup {
    /// Plain-text rendering of the popup
    #[must_use]
    pub fn render(&self, units: Units) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.title);
        let _ = writeln!(out, "{}", self.stop.heading());
        let _ = writeln!(out, "Date: {}", self.date);
        let _ = writeln!(out, "Time: {}", self.time);

        match &self.weather {
            Some(weather) => {
                let _ = writeln!(out, "Weather: {}", weather.description);
                let _ = writeln!(
                    out,
                    "Temp: {}°{}",
                    units.temperature(weather.temperature),
                    units.temperature_label()
                );
                let _ = writeln!(out, "Humidity: {}%", weather.humidity);
                let _ = write!(
                    out,
                    "Wind: {} {} {}",
                    units.wind_speed(weather.wind_speed),
                    units.speed_label(),
                    compass_point(weather.wind_direction)
                );
            }
            None => {
                let _ = write!(out, "No Weather Data");
            }
        }

        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub position: LatLng,
    pub kind: MarkerKind,
    pub popup: Popup,
}

/// A surface markers and the route line can be drawn on
pub trait MapSurface: Send {
    fn add_marker(&mut self, marker: Marker) -> MarkerId;
    fn remove_marker(&mut self, id: MarkerId);
    fn show_route(&mut self, coordinates: &[LatLng]);
    fn clear_route(&mut self);
}

/// Surface that keeps everything in memory; backs the REST API and tests
#[derive(Debug, Default)]
pub struct InMemoryMap {
    next_id: MarkerId,
    markers: BTreeMap<MarkerId, Marker>,
    route: Option<Vec<LatLng>>,
}

impl InMemoryMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Markers in creation order
    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.markers.values()
    }

    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    #[must_use]
    pub fn route(&self) -> Option<&[LatLng]> {
        self.route.as_deref()
    }
}

impl MapSurface for InMemoryMap {
    fn add_marker(&mut self, marker: Marker) -> MarkerId {
        self.next_id += 1;
        self.markers.insert(self.next_id, marker);
        self.next_id
    }

    fn remove_marker(&mut self, id: MarkerId) {
        self.markers.remove(&id);
    }

    fn show_route(&mut self, coordinates: &[LatLng]) {
        self.route = Some(coordinates.to_vec());
    }

    fn clear_route(&mut self) {
        self.route = None;
    }
}

/// What the planner has put on a surface
#[derive(Debug)]
pub struct MapViewState<S> {
    surface: S,
    markers: Vec<MarkerId>,
    route_shown: bool,
}

impl<S: MapSurface> MapViewState<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            markers: Vec::new(),
            route_shown: false,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Remove every marker and the route line
    pub fn clear(&mut self) {
        debug!("Clearing {} markers", self.markers.len());
        for id in self.markers.drain(..) {
            self.surface.remove_marker(id);
        }
        if self.route_shown {
            self.surface.clear_route();
            self.route_shown = false;
        }
    }

    /// Draw the route line, unless `token` has been superseded
    pub fn show_route(&mut self, token: &GenerationToken, coordinates: &[LatLng]) -> bool {
        if token.is_stale() {
            return false;
        }
        self.surface.show_route(coordinates);
        self.route_shown = true;
        true
    }

    /// Add a marker, unless `token` has been superseded
    pub fn place_marker(&mut self, token: &GenerationToken, marker: Marker) -> Option<MarkerId> {
        if token.is_stale() {
            debug!(generation = token.id(), "Dropping marker from stale generation");
            return None;
        }
        let id = self.surface.add_marker(marker);
        self.markers.push(id);
        Some(id)
    }
}
