//! Gatekeeper error types

use thiserror::Error;

/// Errors that can occur during gatekeeper operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatekeeperError {
    /// URL could not be parsed
    #[error("Malformed URL '{url}': {reason}")]
    MalformedUrl {
        /// The raw URL
        url: String,
        /// Parser message
        reason: String,
    },

    /// URL uses a scheme other than http or https
    #[error("Unsupported URL scheme '{scheme}' in '{url}'")]
    UnsupportedScheme {
        /// The raw URL
        url: String,
        /// Offending scheme
        scheme: String,
    },

    /// URL has no host
    #[error("URL '{0}' has no host")]
    MissingHost(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
