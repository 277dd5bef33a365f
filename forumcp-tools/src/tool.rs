//! Tool trait and execution context.

use std::sync::Arc;

use async_trait::async_trait;
use forumcp_store::{SiteState, WriteRateLimiter};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, ToolError};
use crate::protocol::{ToolCallResult, ToolDefinition};

/// Default truncation for post content.
pub const DEFAULT_MAX_READ_LENGTH: usize = 50_000;

/// Tool trait for implementing MCP tools.
///
/// `execute` returns `Err` only for bad arguments; forum failures are
/// reported as an error result so the agent sees the message.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool definition.
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with the given arguments.
    async fn execute(
        &self,
        arguments: Value,
        context: &ToolContext,
        cancel: &CancellationToken,
    ) -> Result<ToolCallResult>;
}

/// Registration and formatting settings.
#[derive(Debug, Clone)]
pub struct ToolSettings {
    /// Register write tools.
    pub allow_writes: bool,
    /// Omit `discourse_select_site` (the server is tethered to one site).
    pub hide_select_site: bool,
    /// Prefix prepended to every search query.
    pub default_search: Option<String>,
    /// Truncate post content beyond this many characters.
    pub max_read_length: usize,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            allow_writes: false,
            hide_select_site: false,
            default_search: None,
            max_read_length: DEFAULT_MAX_READ_LENGTH,
        }
    }
}

/// Context passed to tools during execution.
#[derive(Debug)]
pub struct ToolContext {
    /// Site router.
    pub sites: Arc<SiteState>,
    /// Spacing between writes of the same kind.
    pub writes: WriteRateLimiter,
    /// Settings.
    pub settings: ToolSettings,
}

impl ToolContext {
    /// Creates a context with the default write interval.
    pub fn new(sites: Arc<SiteState>, settings: ToolSettings) -> Self {
        Self {
            sites,
            writes: WriteRateLimiter::default(),
            settings,
        }
    }

    /// Replaces the write rate limiter.
    #[must_use]
    pub fn with_rate_limiter(mut self, writes: WriteRateLimiter) -> Self {
        self.writes = writes;
        self
    }
}

/// Deserializes tool arguments; a missing argument object counts as `{}`.
pub fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    let arguments = if arguments.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidParams(e.to_string()))
}

/// Fails with [`ToolError::InvalidParams`] unless `ok`.
pub fn require(ok: bool, message: impl Into<String>) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(ToolError::InvalidParams(message.into()))
    }
}
