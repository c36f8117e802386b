//! OSRM routing client
//!
//! Asks the OSRM `route` service for the full route geometry plus per-step
//! timings and maps every step and waypoint back onto the route polyline.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::{RoutingService, ensure_success};
use crate::models::{Instruction, LatLng, RouteSummary, RoutedPath};
use crate::{Result, RouteCastError};

/// OSRM HTTP API client
pub struct OsrmClient {
    client: Client,
    base_url: String,
    profile: String,
}

impl OsrmClient {
    pub fn new(client: Client, base_url: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            profile: profile.into(),
        }
    }

    fn route_url(&self, waypoints: &[LatLng]) -> String {
        let coordinates = waypoints
            .iter()
            .map(|p| format!("{},{}", p.lon, p.lat))
            .collect::<Vec<_>>()
            .join(";");
        format!("{}/route/v1/{}/{}", self.base_url, self.profile, coordinates)
    }
}

#[async_trait]
impl RoutingService for OsrmClient {
    #[instrument(skip(self, waypoints), fields(waypoints = waypoints.len()))]
    async fn route(&self, waypoints: &[LatLng]) -> Result<Vec<RoutedPath>> {
        if waypoints.len() < 2 {
            return Err(RouteCastError::validation(
                "A route needs at least two waypoints",
            ));
        }

        let response = self
            .client
            .get(self.route_url(waypoints))
            .query(&[
                ("overview", "full"),
                ("geometries", "geojson"),
                ("steps", "true"),
                ("alternatives", "true"),
            ])
            .send()
            .await?;
        let response = ensure_success(response, "OSRM").await?;
        let body: wire::RouteResponse = response.json().await?;

        let paths = body.into_paths(waypoints.len())?;
        info!("OSRM returned {} route alternatives", paths.len());
        Ok(paths)
    }
}

/// Index of the coordinate closest to `target`, searching from `from` on
fn closest_index_from(coords: &[LatLng], target: LatLng, from: usize) -> usize {
    let squared = |p: &LatLng| (p.lat - target.lat).powi(2) + (p.lon - target.lon).powi(2);
    coords
        .iter()
        .enumerate()
        .skip(from)
        .min_by(|(_, a), (_, b)| squared(a).total_cmp(&squared(b)))
        .map_or(from, |(index, _)| index)
}

mod wire {
    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct RouteResponse {
        pub code: String,
        pub message: Option<String>,
        #[serde(default)]
        pub routes: Vec<Route>,
        #[serde(default)]
        pub waypoints: Vec<Waypoint>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Route {
        /// Meters
        pub distance: f64,
        /// Seconds
        pub duration: f64,
        pub geometry: LineString,
        #[serde(default)]
        pub legs: Vec<Leg>,
    }

    #[derive(Debug, Deserialize)]
    pub struct LineString {
        /// `[lon, lat]` pairs
        pub coordinates: Vec<[f64; 2]>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Leg {
        #[serde(default)]
        pub steps: Vec<Step>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Step {
        pub duration: f64,
        pub geometry: LineString,
    }

    #[derive(Debug, Deserialize)]
    pub struct Waypoint {
        /// Snapped `[lon, lat]`
        pub location: [f64; 2],
    }

    fn to_latlng([lon, lat]: [f64; 2]) -> LatLng {
        LatLng::new(lat, lon)
    }

    impl RouteResponse {
        pub fn into_paths(self, requested: usize) -> Result<Vec<RoutedPath>> {
            if self.code != "Ok" {
                return Err(RouteCastError::routing(format!(
                    "OSRM answered {}: {}",
                    self.code,
                    self.message.unwrap_or_default()
                )));
            }
            if self.waypoints.len() != requested {
                return Err(RouteCastError::parse(format!(
                    "OSRM snapped {} waypoints, {} were requested",
                    self.waypoints.len(),
                    requested
                )));
            }

            let snapped: Vec<LatLng> = self.waypoints.iter().map(|w| to_latlng(w.location)).collect();
            Ok(self
                .routes
                .into_iter()
                .map(|route| route.into_path(&snapped))
                .collect())
        }
    }

    impl Route {
        fn into_path(self, snapped: &[LatLng]) -> RoutedPath {
            let coordinates: Vec<LatLng> =
                self.geometry.coordinates.into_iter().map(to_latlng).collect();

            let mut cursor = 0;
            let mut instructions = Vec::new();
            for step in self.legs.iter().flat_map(|leg| leg.steps.iter()) {
                if let Some(first) = step.geometry.coordinates.first() {
                    cursor = closest_index_from(&coordinates, to_latlng(*first), cursor);
                }
                instructions.push(Instruction {
                    index: cursor,
                    time: step.duration,
                });
            }

            let mut cursor = 0;
            let mut waypoint_indices = Vec::with_capacity(snapped.len());
            for (i, point) in snapped.iter().enumerate() {
                cursor = if i + 1 == snapped.len() {
                    coordinates.len().saturating_sub(1)
                } else {
                    closest_index_from(&coordinates, *point, cursor)
                };
                waypoint_indices.push(cursor);
            }

            debug!(
                "Mapped {} steps and {} waypoints onto {} polyline points",
                instructions.len(),
                waypoint_indices.len(),
                coordinates.len()
            );

            RoutedPath {
                coordinates,
                summary: RouteSummary {
                    total_distance: self.distance,
                    total_time: self.duration,
                },
                waypoint_indices,
                instructions,
            }
        }
    }
}
