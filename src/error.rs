//! Error types and handling for `RouteCast`

use thiserror::Error;

/// Main error type for the `RouteCast` library
#[derive(Error, Debug)]
pub enum RouteCastError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Transport failures and non-success responses from external services
    #[error("API error: {message}")]
    Api { message: String },

    /// A service answered, but not in the shape we expect
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// The routing service returned no usable route
    #[error("Routing error: {message}")]
    Routing { message: String },

    /// Cache operation errors
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl RouteCastError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new routing error
    pub fn routing<S: Into<String>>(message: S) -> Self {
        Self::Routing {
            message: message.into(),
        }
    }

    /// Create a new cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            RouteCastError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            RouteCastError::Api { .. } | RouteCastError::Parse { .. } => {
                "Unable to get a valid answer from external services. Please try again later."
                    .to_string()
            }
            RouteCastError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            RouteCastError::Routing { .. } => {
                "No route could be found between the given stops.".to_string()
            }
            RouteCastError::Cache { .. } => {
                "Cache operation failed. You may need to clear your cache.".to_string()
            }
            RouteCastError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for RouteCastError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::parse(err.to_string())
        } else {
            Self::api(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RouteCastError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(err.to_string())
    }
}
