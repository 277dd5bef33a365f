//! Tool registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::builtin::builtin_tools;
use crate::error::{Result, ToolError};
use crate::protocol::{ToolCallResult, ToolDefinition};
use crate::tool::{Tool, ToolContext};

/// Registry of available tools.
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
    context: Arc<ToolContext>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl ToolRegistry {
    /// Creates a registry with the built-in tools its settings allow.
    pub fn new(context: ToolContext) -> Self {
        let mut registry = Self::empty(context);
        for tool in builtin_tools(&registry.context.settings) {
            registry.register(tool);
        }
        debug!(tools = registry.tools.len(), "Tool registry ready");
        registry
    }

    /// Creates a registry with no tools.
    pub fn empty(context: ToolContext) -> Self {
        Self {
            tools: BTreeMap::new(),
            context: Arc::new(context),
        }
    }

    /// Register a tool, replacing any tool of the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        self.tools.insert(name, tool);
    }

    /// Tool definitions, sorted by name.
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Names of the registered tools.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Execution context shared by all tools.
    pub fn context(&self) -> &ToolContext {
        &self.context
    }

    /// Execute a tool by name.
    #[instrument(skip(self, arguments, cancel))]
    pub async fn execute(
        &self,
        name: &str,
        arguments: Value,
        cancel: &CancellationToken,
    ) -> Result<ToolCallResult> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::ToolNotFound(name.to_string()))?;

        let result = tool.execute(arguments, &self.context, cancel).await?;
        if result.is_error {
            warn!(tool = name, message = %result.joined_text(), "Tool reported failure");
        }
        Ok(result)
    }
}
