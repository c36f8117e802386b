//! Building route requests from saved route strings
//!
//! A saved route is a `"CityA-CityB-CityC"` string plus a departure written
//! as `"YYYY-MM-DD HH:MM"`. Each stop is resolved through a city forecast,
//! which also supplies the stop's canonical name, coordinates and the
//! forecast arrays carried by the waypoint.

use chrono::{Duration, NaiveDateTime};
use tracing::{info, instrument};

use crate::models::{RouteRequest, Waypoint};
use crate::services::{ForecastProvider, ForecastQuery};
use crate::{Result, RouteCastError};

const DEPARTURE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Parse a `"YYYY-MM-DD HH:MM"` departure
pub fn parse_departure(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), DEPARTURE_FORMAT).map_err(|_| {
        RouteCastError::validation(format!(
            "Departure '{value}' is not in YYYY-MM-DD HH:MM format"
        ))
    })
}

/// Stop names of a `"A-B-C"` route string
pub fn split_route(route: &str) -> Result<Vec<String>> {
    let stops: Vec<String> = route.split('-').map(|stop| stop.trim().to_string()).collect();
    if stops.iter().any(String::is_empty) {
        return Err(RouteCastError::validation(format!(
            "Route '{route}' has an empty stop"
        )));
    }
    if stops.len() < 2 {
        return Err(RouteCastError::validation(
            "A route needs at least two stops",
        ));
    }
    Ok(stops)
}

/// Resolve every stop of `route` and build the request for it.
///
/// Stops are looked up one after another; the first failure aborts planning.
/// Every waypoint carries the departure date, only the first one the time.
#[instrument(skip(forecasts))]
pub async fn plan_route(
    route: &str,
    departure: &str,
    forecasts: &dyn ForecastProvider,
) -> Result<RouteRequest> {
    let departure = parse_departure(departure)?;
    let stops = split_route(route)?;

    let mut points = Vec::with_capacity(stops.len());
    for (index, stop) in stops.iter().enumerate() {
        let forecast = forecasts
            .forecast(&ForecastQuery::City(stop.clone()))
            .await?;
        let city = forecast.city.clone().ok_or_else(|| {
            RouteCastError::parse(format!("Forecast for '{stop}' names no city"))
        })?;

        let departure_time = (index == 0).then(|| departure.time());
        points.push(Waypoint::from_forecast(
            city.name,
            city.coord,
            departure.date(),
            departure_time,
            &forecast,
        ));
    }

    info!("Planned route with {} stops", points.len());
    Ok(RouteRequest::new(points))
}

/// Hours and minutes of a `"{h}h {m}min"` label; missing parts count as zero
fn parse_length(length: &str) -> (i64, i64) {
    let mut hours = 0;
    let mut minutes = 0;
    for token in length.split_whitespace() {
        if let Some(value) = token.strip_suffix("min") {
            minutes = value.parse().unwrap_or(0);
        } else if let Some(value) = token.strip_suffix('h') {
            hours = value.parse().unwrap_or(0);
        }
    }
    (hours, minutes)
}

/// When a trip starting at `start` and lasting `length` ends, as
/// `"YYYY-MM-DD HH:MM"`.
///
/// `None` when either input is missing, the start cannot be parsed or the
/// end falls outside the supported date range.
#[must_use]
pub fn end_date_time(start: Option<&str>, length: Option<&str>) -> Option<String> {
    let start = parse_departure(start?).ok()?;
    let (hours, minutes) = parse_length(length?);
    let end = trip_end(start, hours, minutes)?;
    Some(end.format(DEPARTURE_FORMAT).to_string())
}

fn trip_end(start: NaiveDateTime, hours: i64, minutes: i64) -> Option<NaiveDateTime> {
    start
        .checked_add_signed(Duration::try_hours(hours)?)?
        .checked_add_signed(Duration::try_minutes(minutes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Forecast, ForecastCity, ForecastSample, LatLng};
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
    use rstest::rstest;

    struct CityForecasts;

    #[async_trait]
    impl ForecastProvider for CityForecasts {
        async fn forecast(&self, query: &ForecastQuery) -> Result<Forecast> {
            let ForecastQuery::City(name) = query else {
                return Err(RouteCastError::api("coordinates not supported"));
            };
            let coord = match name.to_lowercase().as_str() {
                "london" => LatLng::new(51.5085, -0.1257),
                "paris" => LatLng::new(48.8534, 2.3488),
                _ => return Err(RouteCastError::api(format!("{name} not found"))),
            };
            Ok(Forecast::new(
                Some(ForecastCity {
                    name: format!("{}{}", &name[..1].to_uppercase(), &name[1..]),
                    coord,
                }),
                vec![ForecastSample {
                    timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
                    temperature: 16.0,
                    humidity: 70,
                    wind_speed: 4.0,
                    wind_direction: 200,
                    description: "broken clouds".to_string(),
                }],
            ))
        }
    }

    #[tokio::test]
    async fn test_plan_route_builds_waypoints() {
        let request = plan_route("london-paris", "2024-06-01 09:00", &CityForecasts)
            .await
            .unwrap();

        assert_eq!(request.points.len(), 2);
        let first = &request.points[0];
        assert_eq!(first.city, "London");
        assert_eq!(first.position(), LatLng::new(51.5085, -0.1257));
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(first.departure_time, NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(first.weather_description, vec!["broken clouds"]);

        let second = &request.points[1];
        assert_eq!(second.city, "Paris");
        assert_eq!(second.date, first.date);
        assert!(second.departure_time.is_none());
        assert!(request.inbetween_points.is_none());
    }

    #[tokio::test]
    async fn test_unknown_stop_aborts_planning() {
        let err = plan_route("london-atlantis", "2024-06-01 09:00", &CityForecasts)
            .await
            .unwrap_err();
        assert!(matches!(err, RouteCastError::Api { .. }));
    }

    #[rstest]
    #[case("london")]
    #[case("london--paris")]
    #[case("-paris")]
    fn test_split_route_rejects_malformed(#[case] route: &str) {
        assert!(split_route(route).is_err());
    }

    #[test]
    fn test_parse_departure() {
        assert!(parse_departure("2024-06-01 09:00").is_ok());
        assert!(parse_departure("01/06/2024 09:00").is_err());
    }

    #[rstest]
    #[case(Some("2024-06-01 09:00"), Some("1h 0min"), Some("2024-06-01 10:00"))]
    #[case(Some("2024-06-01 22:30"), Some("3h 45min"), Some("2024-06-02 02:15"))]
    #[case(Some("2024-06-01 09:00"), Some("1h 60min"), Some("2024-06-01 11:00"))]
    #[case(Some("2024-06-01 09:00"), Some("45min"), Some("2024-06-01 09:45"))]
    #[case(None, Some("1h 0min"), None)]
    #[case(Some("2024-06-01 09:00"), None, None)]
    #[case(Some("not a date"), Some("1h 0min"), None)]
    fn test_end_date_time(
        #[case] start: Option<&str>,
        #[case] length: Option<&str>,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(end_date_time(start, length).as_deref(), expected);
    }

    #[test]
    fn test_trip_end_past_the_last_date() {
        let start = NaiveDate::MAX.and_hms_opt(23, 30, 0).unwrap();
        assert_eq!(trip_end(start, 2, 0), None);
        assert_eq!(
            trip_end(start, 0, 15),
            NaiveDate::MAX.and_hms_opt(23, 45, 0)
        );
    }

    #[test]
    fn test_absurd_length_has_no_end() {
        assert_eq!(
            end_date_time(Some("2024-06-01 09:00"), Some("9223372036854775807h 0min")),
            None
        );
    }
}
