//! Forecast memoisation on top of the persistent cache

use std::time::Duration;

use async_trait::async_trait;
use rand::RngExt;
use tracing::{debug, instrument, warn};

use super::{ForecastProvider, ForecastQuery};
use crate::cache::PersistentCache;
use crate::models::Forecast;
use crate::Result;

/// Wraps a [`ForecastProvider`] and stores its answers for `ttl`.
///
/// Each entry's lifetime is jittered by ±10% so entries written together do
/// not expire together. Cache failures are logged and fall through to the
/// wrapped provider.
pub struct CachedForecastProvider<F> {
    inner: F,
    cache: PersistentCache,
    ttl: Duration,
}

impl<F: ForecastProvider> CachedForecastProvider<F> {
    pub fn new(inner: F, cache: PersistentCache, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }

    fn jittered_ttl(&self) -> Duration {
        let jitter: f64 = rand::rng().random_range(0.9..1.1);
        self.ttl.mul_f64(jitter)
    }
}

#[async_trait]
impl<F: ForecastProvider> ForecastProvider for CachedForecastProvider<F> {
    #[instrument(skip(self))]
    async fn forecast(&self, query: &ForecastQuery) -> Result<Forecast> {
        let key = query.cache_key();

        match self.cache.get::<Forecast>(&key).await {
            Ok(Some(cached)) => {
                debug!("Serving forecast from cache");
                return Ok(cached);
            }
            Ok(None) => {}
            Err(e) => warn!("Forecast cache lookup failed: {}", e),
        }

        let forecast = self.inner.forecast(query).await?;

        if let Err(e) = self
            .cache
            .put(&key, forecast.clone(), self.jittered_ttl())
            .await
        {
            warn!("Failed to store forecast in cache: {}", e);
        }
        Ok(forecast)
    }
}
