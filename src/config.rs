//! Configuration management for `RouteCast`
//!
//! Settings come from an optional TOML file, then `ROUTECAST__SECTION__KEY`
//! environment variables, and are checked before the server starts.

use crate::RouteCastError;
use crate::throttle::ThrottlePolicy;
use crate::units::Units;
use anyhow::{Context, Result};
use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure for the `RouteCast` application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteCastConfig {
    /// Upstream service endpoints
    #[serde(default)]
    pub services: ServicesConfig,
    /// Route annotation tuning
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Forecast cache
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// REST server
    #[serde(default)]
    pub server: ServerConfig,
}

/// Upstream service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// Base URL of the OSRM routing service
    #[serde(default = "default_osrm_url")]
    pub osrm_url: String,
    /// OSRM profile (driving, cycling, foot)
    #[serde(default = "default_osrm_profile")]
    pub osrm_profile: String,
    /// Base URL of the Nominatim reverse geocoder
    #[serde(default = "default_nominatim_url")]
    pub nominatim_url: String,
    /// Base URL of the OpenWeatherMap API
    #[serde(default = "default_openweathermap_url")]
    pub openweathermap_url: String,
    /// OpenWeatherMap API key
    pub openweathermap_api_key: Option<String>,
    /// User agent sent with every request; Nominatim requires one
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
}

/// Route annotation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Distance between route samples probed for cities
    #[serde(default = "default_sample_interval")]
    pub sample_interval_km: f64,
    /// How far a forecast may be from the target instant to still count
    #[serde(default = "default_forecast_tolerance")]
    pub forecast_tolerance_minutes: u32,
    /// How close a city must lie to a route segment to be on it
    #[serde(default = "default_on_segment_tolerance")]
    pub on_segment_tolerance_km: f64,
    /// Pause between reverse geocoding calls
    #[serde(default = "default_geocoder_delay")]
    pub geocoder_delay_ms: u64,
    /// IANA timezone waypoint dates and times are given in
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Units used in marker popups
    #[serde(default)]
    pub units: Units,
}

/// Cache configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether forecasts are memoised on disk
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Cache directory location
    #[serde(default = "default_cache_location")]
    pub location: String,
    /// Cache TTL in hours
    #[serde(default = "default_cache_ttl")]
    pub ttl_hours: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// REST server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

// Default value functions
fn default_osrm_url() -> String {
    "https://router.project-osrm.org".to_string()
}

fn default_osrm_profile() -> String {
    "driving".to_string()
}

fn default_nominatim_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_openweathermap_url() -> String {
    "https://api.openweathermap.org".to_string()
}

fn default_user_agent() -> String {
    format!("routecast/{}", crate::VERSION)
}

fn default_timeout() -> u32 {
    30
}

fn default_sample_interval() -> f64 {
    crate::geo::DEFAULT_SAMPLE_INTERVAL_KM
}

fn default_forecast_tolerance() -> u32 {
    120
}

fn default_on_segment_tolerance() -> f64 {
    crate::geo::DEFAULT_ON_SEGMENT_TOLERANCE_KM
}

fn default_geocoder_delay() -> u64 {
    1100
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_location() -> String {
    "~/.cache/routecast".to_string()
}

fn default_cache_ttl() -> u32 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            osrm_url: default_osrm_url(),
            osrm_profile: default_osrm_profile(),
            nominatim_url: default_nominatim_url(),
            openweathermap_url: default_openweathermap_url(),
            openweathermap_api_key: None,
            user_agent: default_user_agent(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_interval_km: default_sample_interval(),
            forecast_tolerance_minutes: default_forecast_tolerance(),
            on_segment_tolerance_km: default_on_segment_tolerance(),
            geocoder_delay_ms: default_geocoder_delay(),
            timezone: default_timezone(),
            units: Units::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            location: default_cache_location(),
            ttl_hours: default_cache_ttl(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl PipelineConfig {
    /// Configured timezone
    pub fn timezone(&self) -> crate::Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|_| {
            RouteCastError::config(format!("Unknown timezone '{}'", self.timezone))
        })
    }

    #[must_use]
    pub fn forecast_tolerance(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.forecast_tolerance_minutes))
    }

    #[must_use]
    pub fn throttle_policy(&self) -> ThrottlePolicy {
        ThrottlePolicy {
            min_interval: Duration::from_millis(self.geocoder_delay_ms),
        }
    }
}

impl CacheConfig {
    /// Cache directory with a leading `~` expanded
    #[must_use]
    pub fn resolved_location(&self) -> PathBuf {
        match self.location.strip_prefix("~/") {
            Some(rest) => dirs::home_dir().map_or_else(|| PathBuf::from(&self.location), |home| home.join(rest)),
            None => PathBuf::from(&self.location),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.ttl_hours) * 3600)
    }
}

impl RouteCastConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // ROUTECAST__SECTION__KEY overrides
        builder = builder.add_source(
            Environment::with_prefix("ROUTECAST")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: RouteCastConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("routecast").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.services.osrm_url.is_empty() {
            self.services.osrm_url = default_osrm_url();
        }
        if self.services.osrm_profile.is_empty() {
            self.services.osrm_profile = default_osrm_profile();
        }
        if self.services.nominatim_url.is_empty() {
            self.services.nominatim_url = default_nominatim_url();
        }
        if self.services.openweathermap_url.is_empty() {
            self.services.openweathermap_url = default_openweathermap_url();
        }
        if self.services.user_agent.is_empty() {
            self.services.user_agent = default_user_agent();
        }
        if self.services.timeout_seconds == 0 {
            self.services.timeout_seconds = default_timeout();
        }
        if self.pipeline.timezone.is_empty() {
            self.pipeline.timezone = default_timezone();
        }
        if self.cache.ttl_hours == 0 {
            self.cache.ttl_hours = default_cache_ttl();
        }
        if self.cache.location.is_empty() {
            self.cache.location = default_cache_location();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate API keys and credentials
    pub fn validate_api_keys(&self) -> Result<()> {
        if let Some(api_key) = &self.services.openweathermap_api_key {
            if api_key.trim().is_empty() {
                return Err(RouteCastError::config(
                    "OpenWeatherMap API key cannot be empty if provided. Either remove it or provide a valid key.",
                )
                .into());
            }

            if api_key.len() < 8 {
                return Err(RouteCastError::config(
                    "OpenWeatherMap API key appears to be invalid (too short). Please check your API key.",
                )
                .into());
            }
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.services.timeout_seconds > 300 {
            return Err(RouteCastError::config("Request timeout cannot exceed 300 seconds").into());
        }

        if !(1.0..=1000.0).contains(&self.pipeline.sample_interval_km) {
            return Err(RouteCastError::config(
                "Sample interval must be between 1 and 1000 km",
            )
            .into());
        }

        if !(self.pipeline.on_segment_tolerance_km > 0.0) {
            return Err(RouteCastError::config("On-segment tolerance must be positive").into());
        }

        if self.pipeline.geocoder_delay_ms < 1000 {
            return Err(RouteCastError::config(
                "Geocoder delay must be at least 1000 ms to respect the Nominatim usage policy",
            )
            .into());
        }

        if self.cache.ttl_hours > 168 {
            return Err(RouteCastError::config("Cache TTL cannot exceed 168 hours (1 week)").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(RouteCastError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(RouteCastError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (name, url) in [
            ("OSRM", &self.services.osrm_url),
            ("Nominatim", &self.services.nominatim_url),
            ("OpenWeatherMap", &self.services.openweathermap_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(RouteCastError::config(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        self.pipeline.timezone()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RouteCastConfig::default();
        assert_eq!(config.services.osrm_url, "https://router.project-osrm.org");
        assert_eq!(config.services.timeout_seconds, 30);
        assert_eq!(config.pipeline.sample_interval_km, 150.0);
        assert_eq!(config.pipeline.forecast_tolerance_minutes, 120);
        assert_eq!(config.pipeline.geocoder_delay_ms, 1100);
        assert_eq!(config.logging.level, "info");
        assert!(config.services.openweathermap_api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = RouteCastConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_geocoder_delay() {
        let mut config = RouteCastConfig::default();
        config.pipeline.geocoder_delay_ms = 200;
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("Nominatim usage policy"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = RouteCastConfig::default();
        config.services.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));

        let mut config = RouteCastConfig::default();
        config.pipeline.sample_interval_km = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_timezone() {
        let mut config = RouteCastConfig::default();
        config.pipeline.timezone = "Europe/Paris".to_string();
        assert_eq!(config.pipeline.timezone().unwrap(), chrono_tz::Europe::Paris);

        config.pipeline.timezone = "Mars/Olympus".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("Unknown timezone"));
    }

    #[test]
    fn test_config_validation_short_api_key() {
        let mut config = RouteCastConfig::default();
        config.services.openweathermap_api_key = Some("abc".to_string());
        assert!(config.validate_api_keys().is_err());

        config.services.openweathermap_api_key = Some("0123456789abcdef".to_string());
        assert!(config.validate_api_keys().is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = std::env::temp_dir().join(format!("routecast-config-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[pipeline]\nsample_interval_km = 80.0\ntimezone = \"Europe/Berlin\"\nunits = \"imperial\"\n\n[server]\nport = 8081\n",
        )
        .unwrap();

        let config = RouteCastConfig::load_from_path(Some(path.clone())).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.pipeline.sample_interval_km, 80.0);
        assert_eq!(config.pipeline.units, Units::Imperial);
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.services.osrm_profile, "driving");
        assert_eq!(config.pipeline.throttle_policy().min_interval, Duration::from_millis(1100));
    }

    #[test]
    fn test_config_path_generation() {
        let path = RouteCastConfig::get_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("routecast"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_cache_location_expands_home() {
        let cache = CacheConfig::default();
        let resolved = cache.resolved_location();
        assert!(resolved.ends_with(".cache/routecast"));
        assert_eq!(cache.ttl(), Duration::from_secs(3 * 3600));
    }
}
