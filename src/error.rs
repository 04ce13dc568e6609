//! Error types for the compatibility analysis subsystem

use thiserror::Error;

/// Result type alias for rigcheck operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the subsystem.
///
/// The first three variants are client-actionable and carry stable codes;
/// upstream and cache failures are internal and surfaced generically.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication required: compatibility analysis is never performed anonymously")]
    Unauthenticated,

    #[error("Hardware profile incomplete: {0}")]
    PreconditionFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Stable code for the gateway/route layer to map onto HTTP responses.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Unauthenticated => "unauthenticated",
            Error::PreconditionFailed(_) => "precondition_failed",
            Error::NotFound(_) => "not_found",
            Error::Upstream(_) => "upstream_error",
            Error::Cache(_) => "cache_error",
            Error::Config(_) => "config_error",
            Error::Io(_) | Error::Json(_) => "internal",
        }
    }

    /// Message safe to return to an end user.
    ///
    /// Client-actionable errors are returned verbatim, including upstream
    /// 4xx payloads. Upstream 5xx bodies and transport details are replaced
    /// with a generic message; the full diagnostics stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            Error::Unauthenticated
            | Error::PreconditionFailed(_)
            | Error::NotFound(_)
            | Error::Upstream(UpstreamError::ClientError { .. }) => self.to_string(),
            _ => "The analysis service is temporarily unavailable".to_string(),
        }
    }
}

/// Failures talking to the catalog, storefront, or AI providers
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Upstream authentication failed")]
    Unauthorized,

    #[error("Upstream rejected the request ({status}): {body}")]
    ClientError { status: u16, body: String },

    #[error("Upstream server error ({0})")]
    ServerError(u16),

    #[error("Upstream request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else if err.is_connect() {
            UpstreamError::Network("Failed to connect to upstream".to_string())
        } else {
            UpstreamError::Network(err.to_string())
        }
    }
}

/// Analysis cache storage errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cache write conflict")]
    Conflict,

    #[error("Cache I/O error: {0}")]
    Io(String),

    #[error("Could not determine cache directory")]
    NoHome,
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found. Create ~/.rigcheck/config.yaml to set up.")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),

    #[error("Catalog credentials not configured. Set catalog.client_id and catalog.client_secret.")]
    MissingCredentials,

    #[error("AI provider not configured. Set ai.api_key.")]
    MissingAiApiKey,
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
