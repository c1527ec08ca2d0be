//! Error types for the shopping assistant.

use thiserror::Error;

/// Errors produced by the shopping assistant.
#[derive(Debug, Error)]
pub enum Error {
    /// A real provider could not be constructed at startup.
    ///
    /// Consumed by the service manager builder, which selects the fallback.
    #[error("Dependency unavailable for '{capability}': {reason}")]
    DependencyUnavailable { capability: String, reason: String },

    /// A provider call failed. Caught per call by the service manager.
    #[error("Provider '{provider}' failed: {reason}")]
    ProviderCallFailed { provider: String, reason: String },

    /// Malformed input that should fail fast.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a provider failure.
    pub fn provider(provider: impl Into<String>, reason: impl ToString) -> Self {
        Error::ProviderCallFailed {
            provider: provider.into(),
            reason: reason.to_string(),
        }
    }

    /// Shorthand for an unavailable dependency.
    pub fn unavailable(capability: impl Into<String>, reason: impl ToString) -> Self {
        Error::DependencyUnavailable {
            capability: capability.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
