//! Finding the cities a route passes through
//!
//! The routed polyline is sampled at a fixed interval and every sample is
//! reverse geocoded, one at a time and paced by the planner's throttle. Each
//! city found gets a pass-by time from its position along the route and a
//! forecast for that moment.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tracing::{debug, info, warn};

use super::orchestrator::RoutePlanner;
use super::stats::DescriptionTally;
use super::timing::{local_instant, pass_by_instant, popup_date, popup_time, to_local};
use crate::generation::GenerationToken;
use crate::geo::{distance_along_route, sample_every_x_km, total_route_distance};
use crate::map_view::{MapSurface, Marker, MarkerKind, Popup, StopKind};
use crate::models::{ForecastSample, IntermediateCity, LatLng, RoutedPath};
use crate::services::ForecastQuery;

/// Locality names that are administrative areas rather than cities
const ADMINISTRATIVE_KEYWORDS: [&str; 5] =
    ["district", "municipal", "municipality", "county", "region"];

/// True when `name` looks like an administrative area
#[must_use]
pub fn is_administrative(name: &str) -> bool {
    let name = name.to_lowercase();
    ADMINISTRATIVE_KEYWORDS
        .iter()
        .any(|keyword| name.contains(keyword))
}

fn pass_by_marker(
    city: &str,
    position: LatLng,
    date: NaiveDate,
    time: NaiveTime,
    weather: Option<ForecastSample>,
) -> Marker {
    Marker {
        position,
        kind: MarkerKind::PassBy,
        popup: Popup {
            title: city.to_string(),
            stop: StopKind::PassBy,
            date: popup_date(date),
            time: popup_time(time),
            weather,
        },
    }
}

impl<S: MapSurface> RoutePlanner<S> {
    /// Sample the route, geocode each sample and annotate the new cities.
    ///
    /// Failed lookups skip the sample. Stops early, without error, once
    /// `token` goes stale.
    pub(super) async fn discover_cities(
        &self,
        token: &GenerationToken,
        path: &RoutedPath,
        departure: DateTime<Utc>,
        user_cities: &HashSet<String>,
        tally: &mut DescriptionTally,
    ) -> Vec<IntermediateCity> {
        let coordinates = &path.coordinates;
        let total_km = total_route_distance(coordinates);
        let samples = sample_every_x_km(coordinates, self.options.sample_interval_km);
        info!(
            "Probing {} route samples every {} km",
            samples.len(),
            self.options.sample_interval_km
        );

        let mut visited = HashSet::new();
        let mut cities = Vec::new();

        for sample in samples {
            if token.is_stale() {
                break;
            }
            self.throttle.acquire().await;
            if token.is_stale() {
                break;
            }

            let place = match self.geocoder.reverse_geocode(sample).await {
                Ok(Some(place)) => place,
                Ok(None) => {
                    debug!(lat = sample.lat, lon = sample.lon, "No locality at sample");
                    continue;
                }
                Err(e) => {
                    warn!(lat = sample.lat, lon = sample.lon, "Reverse geocoding failed: {}", e);
                    continue;
                }
            };
            if token.is_stale() {
                break;
            }

            let Some(city) = place.city.as_deref().map(str::trim) else {
                continue;
            };
            let key = city.to_lowercase();
            if is_administrative(&key) {
                debug!(city, "Skipping administrative area");
                continue;
            }
            if visited.contains(&key) || user_cities.contains(&key) {
                debug!(city, "Skipping city already on the route");
                continue;
            }
            visited.insert(key);

            let Some(along_km) =
                distance_along_route(sample, coordinates, self.options.on_segment_tolerance_km)
            else {
                debug!(city, "Sample does not lie on any route segment");
                continue;
            };
            let fraction = if total_km > 0.0 {
                (along_km / total_km).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let pass_by = match pass_by_instant(departure, fraction, path.summary.total_time) {
                Ok(pass_by) => pass_by,
                Err(e) => {
                    warn!(city, "Cannot time the pass-by: {}", e);
                    continue;
                }
            };

            let forecast = match self
                .forecasts
                .forecast(&ForecastQuery::Coordinates(place.center))
                .await
            {
                Ok(forecast) => forecast,
                Err(e) => {
                    warn!(city, "Failed to fetch weather: {}", e);
                    continue;
                }
            };

            let weather = forecast
                .nearest(pass_by, self.options.forecast_tolerance)
                .cloned();
            let local = to_local(pass_by, self.options.timezone);
            let marker = pass_by_marker(
                city,
                place.center,
                local.date(),
                local.time(),
                weather.clone(),
            );
            if self
                .view
                .lock()
                .await
                .place_marker(token, marker)
                .is_none()
            {
                break;
            }

            tally.record(weather.as_ref());
            debug!(city, fraction, "Added pass-by city");
            cities.push(IntermediateCity {
                city: city.to_string(),
                date: local.date(),
                pass_by_time: local.time(),
                lat: place.center.lat,
                lon: place.center.lon,
                forecast,
            });
        }

        cities
    }

    /// Redisplay the cities of an earlier run from their stored forecasts,
    /// without any network calls
    pub(super) async fn replay_cities(
        &self,
        token: &GenerationToken,
        cached: &[IntermediateCity],
        tally: &mut DescriptionTally,
    ) -> Vec<IntermediateCity> {
        info!("Replaying {} cached pass-by cities", cached.len());

        let mut view = self.view.lock().await;
        for city in cached {
            let weather = local_instant(city.date, city.pass_by_time, self.options.timezone)
                .ok()
                .and_then(|target| {
                    city.forecast
                        .nearest_earliest(target, self.options.forecast_tolerance)
                        .cloned()
                });
            tally.record(weather.as_ref());

            let marker = pass_by_marker(
                &city.city,
                city.position(),
                city.date,
                city.pass_by_time,
                weather,
            );
            if view.place_marker(token, marker).is_none() {
                break;
            }
        }

        cached.to_vec()
    }
}
