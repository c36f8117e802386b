//! OpenWeatherMap current weather and 5 day / 3 hour forecast client

use std::time::Instant;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{info, instrument, warn};

use super::{CurrentWeatherProvider, ForecastProvider, ForecastQuery, ensure_success};
use crate::models::time_format::parse_forecast_stamp;
use crate::models::{CurrentWeather, Forecast, ForecastCity, ForecastSample, LatLng};
use crate::{Result, RouteCastError};

pub struct OpenWeatherMapClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenWeatherMapClient {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// `endpoint` is `forecast` or `weather`
    fn endpoint_url(&self, endpoint: &str, query: &ForecastQuery) -> String {
        match query {
            ForecastQuery::City(name) => format!(
                "{}/data/2.5/{endpoint}?q={}",
                self.base_url,
                urlencoding::encode(name.trim())
            ),
            ForecastQuery::Id(id) => format!(
                "{}/data/2.5/{endpoint}?id={}",
                self.base_url,
                urlencoding::encode(id.trim())
            ),
            ForecastQuery::Coordinates(point) => format!(
                "{}/data/2.5/{endpoint}?lat={}&lon={}",
                self.base_url, point.lat, point.lon
            ),
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, endpoint: &str, query: &ForecastQuery) -> Result<T> {
        let start_time = Instant::now();

        let response = self
            .client
            .get(self.endpoint_url(endpoint, query))
            .query(&[("units", "metric"), ("appid", self.api_key.as_str())])
            .send()
            .await?;
        let response = ensure_success(response, "OpenWeatherMap").await?;
        let body = response.json().await?;

        let elapsed = start_time.elapsed();
        info!("Retrieved {} in {:.3}s", endpoint, elapsed.as_secs_f64());
        if elapsed.as_secs() > 5 {
            warn!("Slow {} API response: {:.3}s", endpoint, elapsed.as_secs_f64());
        }

        Ok(body)
    }
}

#[async_trait]
impl ForecastProvider for OpenWeatherMapClient {
    #[instrument(skip(self))]
    async fn forecast(&self, query: &ForecastQuery) -> Result<Forecast> {
        let body: wire::ForecastResponse = self.fetch("forecast", query).await?;
        body.into_forecast()
    }
}

#[async_trait]
impl CurrentWeatherProvider for OpenWeatherMapClient {
    #[instrument(skip(self))]
    async fn current_weather(&self, query: &ForecastQuery) -> Result<CurrentWeather> {
        let body: wire::WeatherResponse = self.fetch("weather", query).await?;
        body.into_current()
    }
}

mod wire {
    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct ForecastResponse {
        #[serde(default)]
        pub list: Vec<Entry>,
        pub city: Option<City>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Entry {
        /// Unix seconds
        pub dt: Option<i64>,
        pub dt_txt: Option<String>,
        pub main: Main,
        #[serde(default)]
        pub weather: Vec<Condition>,
        pub wind: Option<Wind>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Main {
        pub temp: f64,
        pub humidity: u8,
    }

    #[derive(Debug, Deserialize)]
    pub struct Condition {
        pub description: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct Wind {
        pub speed: f64,
        #[serde(default)]
        pub deg: u16,
    }

    #[derive(Debug, Deserialize)]
    pub struct City {
        pub name: String,
        pub coord: Coord,
    }

    #[derive(Debug, Deserialize)]
    pub struct Coord {
        pub lat: f64,
        pub lon: f64,
    }

    /// Current conditions, `/data/2.5/weather`
    #[derive(Debug, Deserialize)]
    pub struct WeatherResponse {
        /// Unix seconds
        pub dt: i64,
        #[serde(default)]
        pub name: String,
        pub coord: Coord,
        pub main: Main,
        #[serde(default)]
        pub weather: Vec<Condition>,
        pub wind: Option<Wind>,
    }

    fn sample(
        timestamp: DateTime<chrono::Utc>,
        main: Main,
        weather: Vec<Condition>,
        wind: Option<Wind>,
    ) -> ForecastSample {
        let (wind_speed, wind_direction) = wind.map_or((0.0, 0), |wind| (wind.speed, wind.deg));

        ForecastSample {
            timestamp,
            temperature: main.temp,
            humidity: main.humidity,
            wind_speed,
            wind_direction,
            description: weather
                .into_iter()
                .next()
                .map(|condition| condition.description)
                .unwrap_or_default(),
        }
    }

    impl Entry {
        fn into_sample(self) -> Result<ForecastSample> {
            let timestamp = self
                .dt
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .or_else(|| self.dt_txt.as_deref().and_then(parse_forecast_stamp))
                .ok_or_else(|| RouteCastError::parse("Forecast entry has no usable timestamp"))?;

            Ok(sample(timestamp, self.main, self.weather, self.wind))
        }
    }

    impl WeatherResponse {
        pub fn into_current(self) -> Result<CurrentWeather> {
            let timestamp = DateTime::from_timestamp(self.dt, 0).ok_or_else(|| {
                RouteCastError::parse(format!("Weather timestamp {} is out of range", self.dt))
            })?;

            Ok(CurrentWeather {
                city: ForecastCity {
                    name: self.name,
                    coord: LatLng::new(self.coord.lat, self.coord.lon),
                },
                conditions: sample(timestamp, self.main, self.weather, self.wind),
            })
        }
    }

    impl ForecastResponse {
        pub fn into_forecast(self) -> Result<Forecast> {
            let mut samples = self
                .list
                .into_iter()
                .map(Entry::into_sample)
                .collect::<Result<Vec<_>>>()?;
            samples.sort_by_key(|sample| sample.timestamp);

            let city = self.city.map(|city| ForecastCity {
                name: city.name,
                coord: LatLng::new(city.coord.lat, city.coord.lon),
            });

            Ok(Forecast::new(city, samples))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const FORECAST_RESPONSE: &str = r#"{
        "cod": "200",
        "message": 0,
        "cnt": 2,
        "list": [
            {
                "dt": 1717239600,
                "main": {"temp": 18.2, "feels_like": 17.9, "humidity": 71},
                "weather": [{"id": 500, "main": "Rain", "description": "light rain"}],
                "wind": {"speed": 4.6, "deg": 250},
                "dt_txt": "2024-06-01 11:00:00"
            },
            {
                "dt": 1717228800,
                "main": {"temp": 15.0, "humidity": 80},
                "weather": [{"id": 804, "main": "Clouds", "description": "overcast clouds"}],
                "wind": {"speed": 3.1, "deg": 240},
                "dt_txt": "2024-06-01 08:00:00"
            }
        ],
        "city": {"id": 2643743, "name": "London", "coord": {"lat": 51.5085, "lon": -0.1257}, "country": "GB"}
    }"#;

    #[test]
    fn test_parses_and_orders_samples() {
        let body: wire::ForecastResponse = serde_json::from_str(FORECAST_RESPONSE).unwrap();
        let forecast = body.into_forecast().unwrap();

        assert_eq!(forecast.samples.len(), 2);
        assert_eq!(
            forecast.samples[0].timestamp,
            Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
        );
        assert_eq!(forecast.samples[1].description, "light rain");
        assert_eq!(forecast.samples[1].humidity, 71);
        assert_eq!(forecast.samples[1].wind_direction, 250);

        let city = forecast.city.unwrap();
        assert_eq!(city.name, "London");
        assert_eq!(city.coord, LatLng::new(51.5085, -0.1257));
    }

    #[test]
    fn test_falls_back_to_dt_txt() {
        let body: wire::ForecastResponse = serde_json::from_str(
            r#"{"list": [{"main": {"temp": 1.0, "humidity": 90}, "dt_txt": "2024-01-05 21:00:00"}]}"#,
        )
        .unwrap();
        let forecast = body.into_forecast().unwrap();

        let sample = &forecast.samples[0];
        assert_eq!(sample.timestamp, Utc.with_ymd_and_hms(2024, 1, 5, 21, 0, 0).unwrap());
        assert_eq!(sample.description, "");
        assert_eq!(sample.wind_speed, 0.0);
        assert!(forecast.city.is_none());
    }

    #[test]
    fn test_entry_without_timestamp_is_rejected() {
        let body: wire::ForecastResponse =
            serde_json::from_str(r#"{"list": [{"main": {"temp": 1.0, "humidity": 90}}]}"#).unwrap();
        assert!(matches!(
            body.into_forecast().unwrap_err(),
            RouteCastError::Parse { .. }
        ));
    }

    #[test]
    fn test_endpoint_urls() {
        let client = OpenWeatherMapClient::new(Client::new(), "https://api.openweathermap.org/", "key");
        assert_eq!(
            client.endpoint_url("forecast", &ForecastQuery::City("Saint Malo".to_string())),
            "https://api.openweathermap.org/data/2.5/forecast?q=Saint%20Malo"
        );
        assert_eq!(
            client.endpoint_url(
                "forecast",
                &ForecastQuery::Coordinates(LatLng::new(48.65, -2.01))
            ),
            "https://api.openweathermap.org/data/2.5/forecast?lat=48.65&lon=-2.01"
        );
        assert_eq!(
            client.endpoint_url("weather", &ForecastQuery::Id("2643743".to_string())),
            "https://api.openweathermap.org/data/2.5/weather?id=2643743"
        );
    }

    #[test]
    fn test_parses_current_weather() {
        let body: wire::WeatherResponse = serde_json::from_str(
            r#"{
                "coord": {"lon": -0.1257, "lat": 51.5085},
                "weather": [{"id": 300, "main": "Drizzle", "description": "light intensity drizzle"}],
                "main": {"temp": 7.17, "feels_like": 4.2, "humidity": 81},
                "wind": {"speed": 4.1, "deg": 80},
                "dt": 1717239600,
                "id": 2643743,
                "name": "London",
                "cod": 200
            }"#,
        )
        .unwrap();
        let current = body.into_current().unwrap();

        assert_eq!(current.city.name, "London");
        assert_eq!(current.city.coord, LatLng::new(51.5085, -0.1257));
        assert_eq!(
            current.conditions.timestamp,
            Utc.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap()
        );
        assert_eq!(current.conditions.description, "light intensity drizzle");
        assert_eq!(current.conditions.humidity, 81);
        assert_eq!(current.conditions.wind_direction, 80);
    }

    #[test]
    fn test_current_weather_without_wind() {
        let body: wire::WeatherResponse = serde_json::from_str(
            r#"{"coord": {"lon": 2.35, "lat": 48.85}, "main": {"temp": 20.0, "humidity": 40}, "dt": 1717239600}"#,
        )
        .unwrap();
        let current = body.into_current().unwrap();

        assert_eq!(current.city.name, "");
        assert_eq!(current.conditions.wind_speed, 0.0);
        assert_eq!(current.conditions.description, "");
    }
}
