//! Store error types.

use forumcp_core::CoreError;
use forumcp_fetch::FetchError;
use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No site has been selected yet.
    #[error("No site selected. Call discourse_select_site first.")]
    NoSiteSelected,

    /// A site URL could not be normalized.
    #[error(transparent)]
    InvalidSite(#[from] CoreError),

    /// A client could not be built or a request failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Returns true if this is a transient error that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Fetch(e) => e.is_transient(),
            StoreError::Io(_) => true,
            _ => false,
        }
    }
}
