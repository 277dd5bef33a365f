//! MCP server over newline-delimited JSON-RPC.
//!
//! Requests other than `tools/call` are answered in order on the reading
//! task. Tool calls run on their own tasks so a slow forum request does not
//! block `ping` or further calls; their responses are written as they
//! complete.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::{Result, codes};
use crate::protocol::{
    CancelledParams, InitializeParams, InitializeResult, JsonRpcId, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, McpMessage, ServerCapabilities, ServerInfo, ToolCallParams,
    ToolsCapability,
};
use crate::registry::ToolRegistry;

/// MCP protocol version.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name.
pub const SERVER_NAME: &str = "forumcp";

/// Server version.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// JSON-RPC code for a request cancelled by the client.
const REQUEST_CANCELLED: i32 = -32800;

/// MCP server state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialization.
    Uninitialized,
    /// Server is initialized and ready.
    Ready,
    /// Server is shutting down.
    ShuttingDown,
}

/// MCP server for forum tools.
#[derive(Debug, Clone)]
pub struct McpServer {
    state: Arc<RwLock<ServerState>>,
    tools: Arc<ToolRegistry>,
    in_flight: Arc<Mutex<HashMap<JsonRpcId, CancellationToken>>>,
    instructions: Option<String>,
}

impl McpServer {
    /// Creates a server around a tool registry.
    pub fn new(tools: ToolRegistry) -> Self {
        Self {
            state: Arc::new(RwLock::new(ServerState::Uninitialized)),
            tools: Arc::new(tools),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            instructions: None,
        }
    }

    /// Sets the usage hint returned from `initialize`.
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Current state.
    pub async fn state(&self) -> ServerState {
        *self.state.read().await
    }

    /// The tool registry.
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run the server on stdio.
    pub async fn run_stdio(&self) -> Result<()> {
        self.run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serves messages from `reader` until EOF, `shutdown` or `exit`.
    ///
    /// Returns once every in-flight tool call has been answered.
    pub async fn run<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
        let mut tx = Some(tx);
        let mut lines = reader.lines();

        info!("MCP server starting");

        loop {
            tokio::select! {
                line = lines.next_line(), if tx.is_some() => {
                    let Some(line) = line? else {
                        debug!("Input closed");
                        tx = None;
                        continue;
                    };
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if let Some(sender) = &tx {
                        self.dispatch(line, sender).await;
                    }
                    if self.state().await == ServerState::ShuttingDown {
                        tx = None;
                    }
                }
                response = rx.recv() => {
                    let Some(response) = response else {
                        break;
                    };
                    let json = serde_json::to_string(&response)?;
                    writer.write_all(json.as_bytes()).await?;
                    writer.write_all(b"\n").await?;
                    writer.flush().await?;
                }
            }
        }

        info!("MCP server shutting down");
        Ok(())
    }

    async fn dispatch(&self, line: &str, tx: &mpsc::UnboundedSender<JsonRpcResponse>) {
        match McpMessage::parse(line) {
            Ok(McpMessage::Request(request)) if request.method == "tools/call" => {
                let server = self.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    if let Some(response) = server.handle_tools_call(request.id, request.params).await
                    {
                        // The receiver only goes away when the server stops.
                        let _ = tx.send(response);
                    }
                });
            }
            parsed => {
                if let Some(response) = self.handle_parsed(parsed).await {
                    let _ = tx.send(response);
                }
            }
        }
    }

    /// Handle one incoming message and return its response, if any.
    pub async fn handle_message(&self, json: &str) -> Option<JsonRpcResponse> {
        self.handle_parsed(McpMessage::parse(json)).await
    }

    async fn handle_parsed(&self, parsed: Result<McpMessage>) -> Option<JsonRpcResponse> {
        match parsed {
            Ok(McpMessage::Request(request)) => Some(self.handle_request(request).await),
            Ok(McpMessage::Notification(notification)) => {
                self.handle_notification(notification).await;
                None
            }
            // We don't expect responses in this direction
            Ok(McpMessage::Response(_)) => None,
            Err(e) => Some(JsonRpcResponse::from_error(None, &e)),
        }
    }

    /// Handle a JSON-RPC request.
    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id, request.params).await,
            "tools/list" => self.handle_tools_list(id).await,
            "tools/call" => self
                .handle_tools_call(id.clone(), request.params)
                .await
                .unwrap_or_else(|| {
                    JsonRpcResponse::error(id, REQUEST_CANCELLED, "request cancelled")
                }),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "shutdown" => {
                *self.state.write().await = ServerState::ShuttingDown;
                JsonRpcResponse::success(id, json!({}))
            }
            _ => JsonRpcResponse::error(
                id,
                codes::METHOD_NOT_FOUND,
                format!("method not found: {}", request.method),
            ),
        }
    }

    /// Handle a notification (no response expected).
    async fn handle_notification(&self, notification: JsonRpcRequest) {
        match notification.method.as_str() {
            "notifications/initialized" => {
                info!("Client initialized");
            }
            "notifications/cancelled" => {
                let params = notification
                    .params
                    .and_then(|p| serde_json::from_value::<CancelledParams>(p).ok());
                if let Some(params) = params {
                    self.cancel(&params.request_id);
                }
            }
            "exit" => {
                *self.state.write().await = ServerState::ShuttingDown;
            }
            other => {
                debug!(method = other, "Unknown notification");
            }
        }
    }

    fn cancel(&self, id: &JsonRpcId) {
        let in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = in_flight.get(id) {
            debug!(?id, "Cancelling tool call");
            token.cancel();
        }
    }

    /// Handle initialize request.
    async fn handle_initialize(
        &self,
        id: Option<JsonRpcId>,
        params: Option<Value>,
    ) -> JsonRpcResponse {
        let params: InitializeParams = match params.map(serde_json::from_value) {
            Some(Ok(params)) => params,
            Some(Err(e)) => {
                return JsonRpcResponse::error(
                    id,
                    codes::INVALID_PARAMS,
                    format!("invalid initialize params: {e}"),
                );
            }
            None => {
                return JsonRpcResponse::error(
                    id,
                    codes::INVALID_PARAMS,
                    "initialize params required",
                );
            }
        };
        info!(
            client = %params.client_info.name,
            client_version = %params.client_info.version,
            protocol = %params.protocol_version,
            "Initializing"
        );

        *self.state.write().await = ServerState::Ready;

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.into(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.into(),
                version: SERVER_VERSION.into(),
            },
            instructions: self.instructions.clone(),
        };

        JsonRpcResponse::success(id, result)
    }

    /// Handle tools/list request.
    async fn handle_tools_list(&self, id: Option<JsonRpcId>) -> JsonRpcResponse {
        if self.state().await != ServerState::Ready {
            return JsonRpcResponse::error(id, codes::INTERNAL_ERROR, "server not initialized");
        }

        JsonRpcResponse::success(
            id,
            ListToolsResult {
                tools: self.tools.list_tools(),
            },
        )
    }

    /// Handle tools/call request. `None` if the client cancelled it.
    async fn handle_tools_call(
        &self,
        id: Option<JsonRpcId>,
        params: Option<Value>,
    ) -> Option<JsonRpcResponse> {
        if self.state().await != ServerState::Ready {
            return Some(JsonRpcResponse::error(
                id,
                codes::INTERNAL_ERROR,
                "server not initialized",
            ));
        }

        let params: ToolCallParams = match params.map(serde_json::from_value) {
            Some(Ok(params)) => params,
            Some(Err(e)) => {
                return Some(JsonRpcResponse::error(
                    id,
                    codes::INVALID_PARAMS,
                    format!("invalid tool call params: {e}"),
                ));
            }
            None => {
                return Some(JsonRpcResponse::error(
                    id,
                    codes::INVALID_PARAMS,
                    "tool call params required",
                ));
            }
        };

        let token = CancellationToken::new();
        if let Some(id) = &id {
            self.in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(id.clone(), token.clone());
        }

        let outcome = self
            .tools
            .execute(&params.name, params.arguments, &token)
            .await;

        if let Some(id) = &id {
            self.in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(id);
        }
        if token.is_cancelled() {
            debug!(tool = %params.name, "Tool call cancelled; dropping response");
            return None;
        }

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => {
                error!(tool = %params.name, error = %e, "Tool call failed");
                JsonRpcResponse::from_error(id, &e)
            }
        })
    }
}
