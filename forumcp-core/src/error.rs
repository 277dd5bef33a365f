//! Core error types for forumcp.

use thiserror::Error;

/// Core error type for forumcp operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A site URL could not be parsed.
    #[error("Invalid site URL '{url}': {reason}")]
    InvalidSiteUrl {
        /// The rejected input.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Unknown bypass method name.
    #[error("Unknown bypass method '{0}' (expected cloudscraper, curl_cffi or both)")]
    UnknownBypassMethod(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
