//! Stdio MCP server
//!
//! Reads newline-delimited JSON-RPC 2.0 messages, dispatches each request on
//! its own Tokio task, and funnels responses through a channel to a single
//! writer task. A slow `tools/call` (token acquisition may take the full
//! wait bound) therefore never blocks `ping` or other requests.
//!
//! # Handled Methods
//!
//! - `initialize` -- server info, `tools` and `resources` capabilities
//! - `ping` -- empty result
//! - `tools/list`, `tools/call` -- the `graph_command` tool
//! - `resources/list`, `resources/read` -- the `graph://help` resource
//! - notifications -- ignored
//! - everything else -- `-32601 Method not found`

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::auth::config::AuthStrategy;
use crate::error::{GraphMcpError, Result};
use crate::graph::CommandExecutor;
use crate::mcp::resources;
use crate::mcp::tools::{self, GRAPH_COMMAND_TOOL};
use crate::mcp::types::{
    CallToolParams, Implementation, InitializeParams, InitializeResponse, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, ListResourcesResponse, ListToolsResponse,
    ReadResourceParams, ReadResourceResponse, ServerCapabilities, INTERNAL_ERROR,
    INVALID_PARAMS, INVALID_REQUEST, LATEST_PROTOCOL_VERSION, METHOD_INITIALIZE,
    METHOD_INITIALIZED, METHOD_NOT_FOUND, METHOD_PING, METHOD_RESOURCES_LIST, METHOD_RESOURCES_READ,
    METHOD_TOOLS_CALL, METHOD_TOOLS_LIST, PARSE_ERROR, SUPPORTED_PROTOCOL_VERSIONS,
};

/// Name reported in `serverInfo`
pub const SERVER_NAME: &str = "microsoft-graph-mcp";

type RpcResult = std::result::Result<Value, JsonRpcError>;

/// MCP server exposing the Graph command relay
#[derive(Clone)]
pub struct McpServer {
    executor: Arc<CommandExecutor>,
}

impl McpServer {
    /// Create a server around a shared executor
    pub fn new(executor: Arc<CommandExecutor>) -> Self {
        Self { executor }
    }

    /// Serve on the process stdin/stdout until stdin closes
    ///
    /// # Errors
    ///
    /// Returns error if stdin cannot be read or stdout cannot be written
    pub async fn serve_stdio(&self) -> Result<()> {
        tracing::info!("Starting Microsoft Graph MCP server on stdio");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve newline-delimited JSON-RPC on an arbitrary reader/writer pair
    ///
    /// Returns once the reader reaches EOF and every in-flight request has
    /// been answered.
    ///
    /// # Errors
    ///
    /// Returns error if reading or writing fails
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<JsonRpcResponse>();

        let writer_task = tokio::spawn(async move {
            let mut writer = writer;
            while let Some(response) = rx.recv().await {
                let mut line = serde_json::to_string(&response)?;
                line.push('\n');
                writer.write_all(line.as_bytes()).await?;
                writer.flush().await?;
            }
            Ok::<(), GraphMcpError>(())
        });

        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await? {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let request = match parse_request(trimmed) {
                Ok(request) => request,
                Err(response) => {
                    let _ = tx.send(*response);
                    continue;
                }
            };

            let server = self.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(response) = server.handle_request(request).await {
                    let _ = tx.send(response);
                }
            });
        }

        tracing::info!("Input closed; waiting for in-flight requests");
        drop(tx);

        writer_task
            .await
            .map_err(|e| GraphMcpError::Protocol(format!("Response writer failed: {}", e)))??;
        Ok(())
    }

    /// Handle one request; notifications produce no response
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            match request.method.as_str() {
                METHOD_INITIALIZED => tracing::info!("Client initialization complete"),
                other => tracing::debug!("Ignoring notification: {}", other),
            }
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);

        tracing::debug!(method = %request.method, "Request received");

        let result = match request.method.as_str() {
            METHOD_INITIALIZE => self.initialize(request.params),
            METHOD_PING => Ok(Value::Object(Default::default())),
            METHOD_TOOLS_LIST => to_result(&ListToolsResponse {
                tools: vec![tools::graph_command_tool()],
                next_cursor: None,
            }),
            METHOD_TOOLS_CALL => self.call_tool(request.params).await,
            METHOD_RESOURCES_LIST => to_result(&ListResourcesResponse {
                resources: resources::list(),
                next_cursor: None,
            }),
            METHOD_RESOURCES_READ => read_resource(request.params),
            other => Err(JsonRpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            )),
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(error) => {
                tracing::debug!("Request {} failed: {}", request.method, error);
                JsonRpcResponse::failure(id, error)
            }
        })
    }

    fn initialize(&self, params: Option<Value>) -> RpcResult {
        let params: InitializeParams = parse_params(params)?;
        let protocol_version = if SUPPORTED_PROTOCOL_VERSIONS.contains(&params.protocol_version.as_str()) {
            params.protocol_version
        } else {
            LATEST_PROTOCOL_VERSION.to_string()
        };

        if let Some(client) = &params.client_info {
            tracing::info!(client = %client.name, version = %client.version, %protocol_version, "Client initialized");
        }

        to_result(&InitializeResponse {
            protocol_version,
            capabilities: ServerCapabilities {
                tools: Some(Value::Object(Default::default())),
                resources: Some(Value::Object(Default::default())),
            },
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: Some("Relays commands to Microsoft Graph".to_string()),
            },
            instructions: Some(self.instructions()),
        })
    }

    fn instructions(&self) -> String {
        let auth = self.executor.auth_config();
        match auth.auth_strategy() {
            AuthStrategy::DeviceCode => format!(
                "Use the {} tool to call Microsoft Graph. Authentication uses the device code flow \
                 (read-only, client {}); the first call returns a URL and code to sign in with. \
                 Read graph://help for examples.",
                GRAPH_COMMAND_TOOL, auth.client_id
            ),
            AuthStrategy::ClientSecret => format!(
                "Use the {} tool to call Microsoft Graph. Authentication uses the custom app \
                 registration {} in tenant {} with a client secret, supplied through the \
                 environment or the client_secret argument. Read graph://help for examples.",
                GRAPH_COMMAND_TOOL, auth.client_id, auth.tenant_id
            ),
        }
    }

    async fn call_tool(&self, params: Option<Value>) -> RpcResult {
        let params: CallToolParams = parse_params(params)?;
        if params.name != GRAPH_COMMAND_TOOL {
            return Err(JsonRpcError::new(
                INVALID_PARAMS,
                format!("Unknown tool: {}", params.name),
            ));
        }
        let response = tools::call_graph_command(&self.executor, params.arguments).await;
        to_result(&response)
    }
}

fn read_resource(params: Option<Value>) -> RpcResult {
    let params: ReadResourceParams = parse_params(params)?;
    match resources::read(&params.uri) {
        Some(contents) => to_result(&ReadResourceResponse {
            contents: vec![contents],
        }),
        None => Err(JsonRpcError::new(
            INVALID_PARAMS,
            format!("Unknown resource: {}", params.uri),
        )),
    }
}

/// Parse one line into a request, or the error response to send instead
fn parse_request(line: &str) -> std::result::Result<JsonRpcRequest, Box<JsonRpcResponse>> {
    let value: Value = serde_json::from_str(line).map_err(|e| {
        tracing::warn!("Malformed JSON-RPC message: {}", e);
        Box::new(JsonRpcResponse::failure(
            Value::Null,
            JsonRpcError::new(PARSE_ERROR, "Parse error"),
        ))
    })?;

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| {
        Box::new(JsonRpcResponse::failure(
            id,
            JsonRpcError::new(INVALID_REQUEST, format!("Invalid Request: {}", e)),
        ))
    })
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> std::result::Result<T, JsonRpcError> {
    let params = params.unwrap_or(Value::Null);
    serde_json::from_value(params)
        .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("Invalid params: {}", e)))
}

fn to_result<T: serde::Serialize>(value: &T) -> RpcResult {
    serde_json::to_value(value).map_err(|e| JsonRpcError::new(INTERNAL_ERROR, e.to_string()))
}
