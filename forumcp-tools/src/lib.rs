// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! # forumcp Tools
//!
//! Exposes a Discourse forum to an agent as MCP tools.
//!
//! - [`server::McpServer`] - JSON-RPC 2.0 over newline-delimited stdio
//! - [`registry::ToolRegistry`] - Name to [`tool::Tool`] lookup
//! - [`builtin`] - Search, topic, post, category, tag, user and write tools
//!
//! ## Example
//!
//! ```ignore
//! use forumcp_tools::{McpServer, ToolContext, ToolRegistry, ToolSettings};
//!
//! let context = ToolContext::new(sites, ToolSettings::default());
//! McpServer::new(ToolRegistry::new(context)).run_stdio().await?;
//! ```

pub mod builtin;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod tool;

pub use error::{Result, ToolError};
pub use protocol::{ContentItem, JsonRpcId, JsonRpcResponse, ToolCallResult, ToolDefinition};
pub use registry::ToolRegistry;
pub use server::{McpServer, PROTOCOL_VERSION, SERVER_NAME, SERVER_VERSION, ServerState};
pub use tool::{DEFAULT_MAX_READ_LENGTH, Tool, ToolContext, ToolSettings, parse_args};
