//! Nominatim reverse geocoding client

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{ReverseGeocoder, ReversePlace, ensure_success};
use crate::models::LatLng;
use crate::{Result, RouteCastError};

/// Reverse geocoder backed by a Nominatim instance.
///
/// Callers are responsible for pacing; the public instance allows one
/// request per second.
pub struct NominatimClient {
    client: Client,
    base_url: String,
    language: String,
}

impl NominatimClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            language: "en".to_string(),
        }
    }

    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimClient {
    #[instrument(skip(self), fields(lat = point.lat, lon = point.lon))]
    async fn reverse_geocode(&self, point: LatLng) -> Result<Option<ReversePlace>> {
        let url = format!("{}/reverse", self.base_url);
        let response = self
            .client
            .get(url)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", point.lat.to_string()),
                ("lon", point.lon.to_string()),
                ("accept-language", self.language.clone()),
            ])
            .send()
            .await?;
        let response = ensure_success(response, "Nominatim").await?;
        let body: wire::ReverseResponse = response.json().await?;

        let place = body.into_place()?;
        debug!(
            "Reverse geocoded to {:?}",
            place.as_ref().and_then(|p| p.city.as_deref())
        );
        Ok(place)
    }
}

mod wire {
    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct ReverseResponse {
        pub error: Option<String>,
        /// Nominatim sends coordinates as strings
        pub lat: Option<String>,
        pub lon: Option<String>,
        pub address: Option<Address>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Address {
        pub city: Option<String>,
    }

    fn parse_coordinate(name: &str, raw: Option<&str>) -> Result<f64> {
        let raw = raw.ok_or_else(|| RouteCastError::parse(format!("Nominatim reply has no {name}")))?;
        raw.trim()
            .parse()
            .map_err(|_| RouteCastError::parse(format!("Nominatim {name} '{raw}' is not a number")))
    }

    impl ReverseResponse {
        pub fn into_place(self) -> Result<Option<ReversePlace>> {
            if self.error.is_some() {
                return Ok(None);
            }

            let lat = parse_coordinate("lat", self.lat.as_deref())?;
            let lon = parse_coordinate("lon", self.lon.as_deref())?;
            let city = self
                .address
                .and_then(|address| address.city)
                .filter(|city| !city.trim().is_empty());

            Ok(Some(ReversePlace {
                city,
                center: LatLng::new(lat, lon),
            }))
        }
    }
}
