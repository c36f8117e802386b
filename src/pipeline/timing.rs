//! Trip clock: leg timing, arrival instants and local wall-clock rendering

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::models::{ForecastSample, Waypoint, nearest_sample};
use crate::{Result, RouteCastError};

/// `"{h}h {m}min"` for a duration in seconds.
///
/// Minutes are rounded, not truncated, so 7170 s reads `"1h 60min"`.
#[must_use]
pub fn format_duration(total_seconds: f64) -> String {
    let total_seconds = total_seconds.max(0.0);
    let hours = (total_seconds / 3600.0).floor();
    let minutes = ((total_seconds % 3600.0) / 60.0).round();
    format!("{hours}h {minutes}min")
}

/// Route length in whole kilometers
#[must_use]
pub fn distance_km(meters: f64) -> u64 {
    (meters.max(0.0) / 1000.0).round() as u64
}

fn seconds(value: f64) -> Option<Duration> {
    Duration::try_milliseconds((value * 1000.0).round() as i64)
}

/// `instant + value` seconds, or a validation error when the result falls
/// outside the representable calendar
fn shift(instant: DateTime<Utc>, value: f64) -> Result<DateTime<Utc>> {
    seconds(value)
        .and_then(|delta| instant.checked_add_signed(delta))
        .ok_or_else(|| {
            RouteCastError::validation(format!(
                "Travel time of {value} s from {instant} leaves the supported date range"
            ))
        })
}

/// Interpret a local date and time in `tz`.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant; times that
/// do not exist (DST spring-forward) are rejected.
pub fn local_instant(date: NaiveDate, time: NaiveTime, tz: Tz) -> Result<DateTime<Utc>> {
    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| {
            RouteCastError::validation(format!("{date} {time} does not exist in {}", tz.name()))
        })
}

/// Wall-clock reading of `instant` in `tz`
#[must_use]
pub fn to_local(instant: DateTime<Utc>, tz: Tz) -> NaiveDateTime {
    instant.with_timezone(&tz).naive_local()
}

/// Departure instant of a route, from the first waypoint
pub fn departure_instant(first: &Waypoint, tz: Tz) -> Result<DateTime<Utc>> {
    let time = first.departure_time.ok_or_else(|| {
        RouteCastError::validation(format!(
            "The first waypoint ({}) has no departure time",
            first.city
        ))
    })?;
    local_instant(first.date, time, tz)
}

/// Arrival instant at every waypoint: the departure, then one entry per leg
pub fn arrival_times(departure: DateTime<Utc>, leg_durations: &[f64]) -> Result<Vec<DateTime<Utc>>> {
    let mut arrivals = Vec::with_capacity(leg_durations.len() + 1);
    let mut current = departure;
    arrivals.push(current);
    for leg in leg_durations {
        current = shift(current, *leg)?;
        arrivals.push(current);
    }
    Ok(arrivals)
}

/// Instant the route passes a point `fraction` of the way along it
pub fn pass_by_instant(
    departure: DateTime<Utc>,
    fraction: f64,
    total_time_s: f64,
) -> Result<DateTime<Utc>> {
    shift(departure, total_time_s * fraction)
}

/// Forecast sample from the waypoint's own arrays closest to `arrival`
#[must_use]
pub fn waypoint_weather(
    waypoint: &Waypoint,
    arrival: DateTime<Utc>,
    tolerance: Duration,
) -> Option<ForecastSample> {
    let samples: Vec<ForecastSample> = (0..waypoint.dates.len())
        .filter_map(|index| waypoint.forecast_sample(index))
        .collect();
    nearest_sample(&samples, arrival, tolerance).cloned()
}

/// `DD/MM/YYYY`
#[must_use]
pub fn popup_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// `HH:MM`
#[must_use]
pub fn popup_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}
