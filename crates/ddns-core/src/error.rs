//! Error types for the DDNS client
//!
//! Every error in this module is fatal to the reconciliation cycle that raised
//! it. Provider credential rejection is deliberately not an error: it surfaces as
//! [`ReconciliationOutcome::AuthFailed`](crate::traits::ReconciliationOutcome::AuthFailed).

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS client
#[derive(Error, Debug)]
pub enum Error {
    /// A required configuration key is missing or has an invalid value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport failure on an outbound call
    #[error("Network error: {0}")]
    Network(String),

    /// A response did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// The provider API answered with a non-success status
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// The notification channel rejected a message
    #[error("Notifier error: {0}")]
    Notifier(String),

    /// Local I/O failures (socket bind, signal setup)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a notifier error
    pub fn notifier(msg: impl Into<String>) -> Self {
        Self::Notifier(msg.into())
    }

    /// Whether this error was raised while loading configuration
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
