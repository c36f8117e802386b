//! Route generation: route the stops, annotate them with weather and report
//! the trip summary

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use super::stats::DescriptionTally;
use super::timing::{
    arrival_times, departure_instant, distance_km, format_duration, popup_date, popup_time,
    to_local, waypoint_weather,
};
use crate::config::PipelineConfig;
use crate::generation::{GenerationCounter, GenerationToken};
use crate::map_view::{MapSurface, MapViewState, Marker, MarkerKind, Popup, StopKind};
use crate::models::{GenerationOutcome, RouteOutcome, RouteRequest, RoutedPath};
use crate::services::{ForecastProvider, ReverseGeocoder, RoutingService};
use crate::throttle::{Throttle, ThrottlePolicy};
use crate::units::Units;
use crate::{Result, RouteCastError};

/// Tuning knobs for a [`RoutePlanner`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannerOptions {
    pub sample_interval_km: f64,
    pub on_segment_tolerance_km: f64,
    pub forecast_tolerance: Duration,
    /// Zone waypoint dates/times are given in and popups are rendered in
    pub timezone: Tz,
    pub units: Units,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            sample_interval_km: crate::geo::DEFAULT_SAMPLE_INTERVAL_KM,
            on_segment_tolerance_km: crate::geo::DEFAULT_ON_SEGMENT_TOLERANCE_KM,
            forecast_tolerance: Duration::hours(2),
            timezone: chrono_tz::UTC,
            units: Units::Metric,
        }
    }
}

impl PlannerOptions {
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            sample_interval_km: config.sample_interval_km,
            on_segment_tolerance_km: config.on_segment_tolerance_km,
            forecast_tolerance: config.forecast_tolerance(),
            timezone: config.timezone()?,
            units: config.units,
        })
    }
}

/// Owns the map view and runs route generations against it.
///
/// Only the newest generation may touch the map or report a result. Starting
/// a generation clears the map and makes every earlier one stale; stale
/// generations finish their in-flight calls and then stop quietly.
pub struct RoutePlanner<S> {
    pub(super) router: Arc<dyn RoutingService>,
    pub(super) geocoder: Arc<dyn ReverseGeocoder>,
    pub(super) forecasts: Arc<dyn ForecastProvider>,
    pub(super) throttle: Arc<Throttle>,
    pub(super) generations: GenerationCounter,
    pub(super) view: Mutex<MapViewState<S>>,
    pub(super) options: PlannerOptions,
}

impl<S: MapSurface> RoutePlanner<S> {
    pub fn new(
        router: Arc<dyn RoutingService>,
        geocoder: Arc<dyn ReverseGeocoder>,
        forecasts: Arc<dyn ForecastProvider>,
        surface: S,
    ) -> Self {
        Self {
            router,
            geocoder,
            forecasts,
            throttle: Arc::new(Throttle::new(ThrottlePolicy::default())),
            generations: GenerationCounter::new(),
            view: Mutex::new(MapViewState::new(surface)),
            options: PlannerOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: PlannerOptions) -> Self {
        self.options = options;
        self
    }

    /// Pace reverse geocoding with `throttle`, which may be shared with other
    /// planners using the same geocoder
    #[must_use]
    pub fn with_throttle(mut self, throttle: Arc<Throttle>) -> Self {
        self.throttle = throttle;
        self
    }

    #[must_use]
    pub fn options(&self) -> &PlannerOptions {
        &self.options
    }

    #[must_use]
    pub fn generations(&self) -> &GenerationCounter {
        &self.generations
    }

    /// Read the current map view
    pub async fn with_view<R>(&self, f: impl FnOnce(&MapViewState<S>) -> R) -> R {
        let view = self.view.lock().await;
        f(&view)
    }

    /// Run one route generation.
    ///
    /// Always supersedes earlier generations and clears the map first, even
    /// when the request is empty or turns out to be invalid.
    pub async fn generate(&self, request: &RouteRequest) -> Result<GenerationOutcome> {
        let (outcome, _) = self.generate_and_inspect(request, |_| ()).await?;
        Ok(outcome)
    }

    /// Run one route generation and read the map it left behind.
    ///
    /// `inspect` runs under the view lock, right after the generation is
    /// confirmed current, so it sees exactly this generation's markers. It
    /// only runs for [`GenerationOutcome::Completed`].
    #[instrument(skip(self, request, inspect), fields(waypoints = request.points.len()))]
    pub async fn generate_and_inspect<R>(
        &self,
        request: &RouteRequest,
        inspect: impl FnOnce(&MapViewState<S>) -> R + Send,
    ) -> Result<(GenerationOutcome, Option<R>)> {
        let token = {
            let mut view = self.view.lock().await;
            let token = self.generations.advance();
            view.clear();
            token
        };
        info!(generation = token.id(), "Starting route generation");

        if request.is_empty() {
            debug!("Empty route request, nothing to do");
            return Ok((GenerationOutcome::Empty, None));
        }
        if request.points.len() < 2 {
            return Err(RouteCastError::validation(
                "A route needs at least two waypoints",
            ));
        }
        let departure = departure_instant(&request.points[0], self.options.timezone)?;

        let path = self
            .router
            .route(&request.positions())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RouteCastError::routing("The routing service returned no route"))?;

        if !self.view.lock().await.show_route(&token, &path.coordinates) {
            return Ok((self.superseded(&token), None));
        }

        let distance = distance_km(path.summary.total_distance);
        let estimated_time = format_duration(path.summary.total_time);
        info!("Route is {} km, {}", distance, estimated_time);

        let mut tally = DescriptionTally::new();
        if !self
            .annotate_waypoints(&token, request, &path, departure, &mut tally)
            .await?
        {
            return Ok((self.superseded(&token), None));
        }

        let intermediate_cities = match &request.inbetween_points {
            Some(cached) => self.replay_cities(&token, cached, &mut tally).await,
            None => {
                self.discover_cities(
                    &token,
                    &path,
                    departure,
                    &request.user_city_keys(),
                    &mut tally,
                )
                .await
            }
        };

        let snapshot = {
            let view = self.view.lock().await;
            if token.is_stale() {
                return Ok((self.superseded(&token), None));
            }
            inspect(&view)
        };

        let outcome = RouteOutcome {
            distance_km: distance,
            estimated_time,
            intermediate_cities,
            dominant_weather: tally.dominant(),
        };
        info!(
            generation = token.id(),
            cities = outcome.intermediate_cities.len(),
            "Route generation finished"
        );
        Ok((GenerationOutcome::Completed(outcome), Some(snapshot)))
    }

    fn superseded(&self, token: &GenerationToken) -> GenerationOutcome {
        debug!(
            generation = token.id(),
            current = self.generations.current(),
            "Generation superseded, dropping its results"
        );
        GenerationOutcome::Superseded
    }

    /// Put a marker on every user stop. Returns `false` once `token` is stale.
    async fn annotate_waypoints(
        &self,
        token: &GenerationToken,
        request: &RouteRequest,
        path: &RoutedPath,
        departure: DateTime<Utc>,
        tally: &mut DescriptionTally,
    ) -> Result<bool> {
        let arrivals = arrival_times(departure, &path.leg_durations())?;
        let count = request.points.len();

        let mut view = self.view.lock().await;
        for (index, waypoint) in request.points.iter().enumerate() {
            let arrival = arrivals
                .get(index)
                .or_else(|| arrivals.last())
                .copied()
                .unwrap_or(departure);
            let weather = waypoint_weather(waypoint, arrival, self.options.forecast_tolerance);
            if weather.is_none() {
                debug!(city = %waypoint.city, "No forecast within tolerance of arrival");
            }
            tally.record(weather.as_ref());

            let local = to_local(arrival, self.options.timezone);
            let marker = Marker {
                position: waypoint.position(),
                kind: MarkerKind::Waypoint,
                popup: Popup {
                    title: waypoint.city.clone(),
                    stop: StopKind::for_waypoint(index, count),
                    date: popup_date(local.date()),
                    time: popup_time(local.time()),
                    weather,
                },
            };
            if view.place_marker(token, marker).is_none() {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_config() {
        let mut config = PipelineConfig::default();
        config.timezone = "Europe/Lisbon".to_string();
        config.forecast_tolerance_minutes = 90;

        let options = PlannerOptions::from_config(&config).unwrap();
        assert_eq!(options.timezone, chrono_tz::Europe::Lisbon);
        assert_eq!(options.forecast_tolerance, Duration::minutes(90));
        assert_eq!(options.sample_interval_km, 150.0);
    }

    #[test]
    fn test_options_reject_unknown_timezone() {
        let mut config = PipelineConfig::default();
        config.timezone = "Nowhere/Special".to_string();
        assert!(PlannerOptions::from_config(&config).is_err());
    }
}
