//! Error types for kafka-info

/// Result type alias for lag fetches
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for configuration loading
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while fetching consumer lag
///
/// Every variant is recovered inside the widget and rendered inline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Request failed, timed out, or returned a non-2xx status
    #[error("network error: {0}")]
    Network(String),

    /// Body could not be parsed into the expected shape
    #[error("parse error: {0}")]
    Parse(String),

    /// Well-formed response with no rows for the entity's consumer groups
    #[error("no lag data for consumer groups: {groups}")]
    NoMatch { groups: String },

    /// Anything else (missing cluster, server-side query error)
    #[error("unspecified error: {0}")]
    Unspecified(String),
}

impl FetchError {
    /// Build a network error from an HTTP status code
    pub fn http_status(status: u16) -> Self {
        Self::Network(format!("HTTP {status}"))
    }

    /// Build a network error for an expired request
    pub fn timeout(timeout: std::time::Duration) -> Self {
        Self::Network(format!("request timed out after {}ms", timeout.as_millis()))
    }

    pub fn is_network(&self) -> bool {
        matches!(self, FetchError::Network(_))
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, FetchError::Parse(_))
    }

    pub fn is_no_match(&self) -> bool {
        matches!(self, FetchError::NoMatch { .. })
    }

    /// Short heading shown above the error message
    pub fn title(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "Could not reach the metrics endpoint",
            FetchError::Parse(_) => "Unexpected metrics response",
            FetchError::NoMatch { .. } => "No lag data for this entity",
            FetchError::Unspecified(_) => "Unspecified error",
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

impl From<gloo_net::Error> for FetchError {
    fn from(err: gloo_net::Error) -> Self {
        match err {
            gloo_net::Error::SerdeError(e) => FetchError::Parse(e.to_string()),
            other => FetchError::Network(other.to_string()),
        }
    }
}

/// Errors raised while reading the injected configuration or entity
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Nothing was injected under the expected key
    #[error("missing {0}")]
    Missing(&'static str),

    /// Injected value is not valid JSON for the expected shape
    #[error("invalid {what}: {message}")]
    Invalid { what: &'static str, message: String },

    /// Value parsed but failed validation
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl From<validator::ValidationErrors> for ConfigError {
    fn from(err: validator::ValidationErrors) -> Self {
        ConfigError::Validation(err.to_string())
    }
}
