use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use routecast::api::AppState;
use routecast::cache::PersistentCache;
use routecast::config::LoggingConfig;
use routecast::services::{
    self, CachedForecastProvider, CurrentWeatherProvider, ForecastProvider, NominatimClient,
    OpenWeatherMapClient, OsrmClient, ReverseGeocoder, RoutingService,
};
use routecast::{InMemoryMap, PlannerOptions, RouteCastConfig, RoutePlanner, Throttle, web};

fn init_tracing(logging: &LoggingConfig) {
    // RUST_LOG wins over the configured level
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = RouteCastConfig::load_from_path(config_path)?;
    init_tracing(&config.logging);
    tracing::info!("Starting routecast {}", routecast::VERSION);

    let api_key = config
        .services
        .openweathermap_api_key
        .clone()
        .context("No OpenWeatherMap API key configured (set ROUTECAST__SERVICES__OPENWEATHERMAP_API_KEY)")?;

    let client = services::http_client(&config.services)?;
    let router: Arc<dyn RoutingService> = Arc::new(OsrmClient::new(
        client.clone(),
        &config.services.osrm_url,
        &config.services.osrm_profile,
    ));
    let geocoder: Arc<dyn ReverseGeocoder> =
        Arc::new(NominatimClient::new(client.clone(), &config.services.nominatim_url));
    let weather = Arc::new(OpenWeatherMapClient::new(
        client,
        &config.services.openweathermap_url,
        api_key,
    ));

    let forecasts: Arc<dyn ForecastProvider> = if config.cache.enabled {
        let location = config.cache.resolved_location();
        let cache = PersistentCache::open(&location)
            .with_context(|| format!("Failed to open forecast cache at {}", location.display()))?;
        tracing::info!("Caching forecasts in {}", location.display());
        Arc::new(CachedForecastProvider::new(
            Arc::clone(&weather),
            cache,
            config.cache.ttl(),
        ))
    } else {
        weather.clone()
    };

    let throttle = Arc::new(Throttle::new(config.pipeline.throttle_policy()));
    let planner = RoutePlanner::new(
        router,
        Arc::clone(&geocoder),
        Arc::clone(&forecasts),
        InMemoryMap::new(),
    )
    .with_options(PlannerOptions::from_config(&config.pipeline)?)
    .with_throttle(Arc::clone(&throttle));

    let state = AppState {
        planner: Arc::new(planner),
        geocoder,
        forecasts,
        weather: weather as Arc<dyn CurrentWeatherProvider>,
        geocoder_throttle: throttle,
    };

    web::run(&config.server, state).await
}
