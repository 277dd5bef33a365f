//! Error types for the tool layer.

use forumcp_fetch::FetchError;
use forumcp_store::StoreError;
use thiserror::Error;

/// Result type alias.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Tool layer errors.
///
/// Only protocol-level problems become JSON-RPC errors. Failures talking to
/// the forum are reported by each tool as an error result.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Malformed JSON-RPC message.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Tool not found.
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Invalid parameters.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// Routing or configuration error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Request to the forum failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// JSON-RPC error code for this error.
    pub fn code(&self) -> i32 {
        match self {
            ToolError::InvalidRequest(_) => codes::INVALID_REQUEST,
            ToolError::ToolNotFound(_) => codes::METHOD_NOT_FOUND,
            ToolError::InvalidParams(_) => codes::INVALID_PARAMS,
            ToolError::Store(_) | ToolError::Fetch(_) => codes::SERVER_ERROR,
            ToolError::Serialization(_) => codes::PARSE_ERROR,
            ToolError::Io(_) | ToolError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }
}

/// Standard JSON-RPC error codes.
pub mod codes {
    /// Parse error.
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid request.
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method not found.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid params.
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error.
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Implementation-defined server error.
    pub const SERVER_ERROR: i32 = -32000;
}
