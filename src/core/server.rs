/// MCP Server Implementation
///
/// This module contains the core MCP server implementation including:
/// - JSON-RPC 2.0 request/response structures
/// - Tool registry for managing available tools
/// - STDIO server implementation for line-based communication
/// - Request handlers for MCP protocol methods

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::core::config::ServerConfig;
use crate::core::error::{Error, Result};
use crate::tools;
use crate::tools::add::ResultRecord;

/// JSON-RPC error codes used by this server.
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;

/// Protocol versions this server can speak, oldest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26", "2025-06-18"];

/// Version answered when the client asks for one we don't know.
pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";

/// JSON-RPC 2.0 request structure for MCP protocol.
///
/// All MCP requests follow the JSON-RPC 2.0 specification. The jsonrpc field
/// must be "2.0", id is optional (None for notifications), method specifies
/// the MCP method to call, and params contains method-specific parameters.
#[derive(Deserialize, Debug)]
pub struct MCPRequest {
    /// JSON-RPC version identifier, must be "2.0"
    jsonrpc: String,
    /// Request ID for correlating responses. None indicates a notification.
    id: Option<Value>,
    /// MCP method name (e.g., "initialize", "tools/list", "tools/call")
    method: String,
    /// Method-specific parameters as JSON value
    params: Option<Value>,
}

/// JSON-RPC 2.0 response structure for MCP protocol.
///
/// Responses must include jsonrpc "2.0", the request id, and either a result
/// or an error. The id is null when the request could not be parsed.
#[derive(Serialize, Debug)]
pub struct MCPResponse {
    jsonrpc: String,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<MCPError>,
}

impl MCPResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(MCPError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// JSON-RPC 2.0 error structure.
#[derive(Serialize, Debug)]
pub struct MCPError {
    /// JSON-RPC error code (e.g., -32601 for method not found)
    code: i32,
    /// Human-readable error message
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

/// MCP tool definition structure.
///
/// Each tool must have a unique name, description, and JSON schema defining
/// its input parameters. This structure is serialized when listing tools.
#[derive(Serialize, Debug, Clone)]
pub struct MCPTool {
    /// Unique tool identifier (e.g., "add")
    pub name: String,
    /// Human-readable description of what the tool does
    pub description: String,
    /// JSON Schema defining the tool's input parameters
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Tool handler function type definition.
///
/// Handlers receive the session state mutably along with the JSON arguments
/// and return either a JSON result or an error. Any state a tool keeps across
/// calls lives in `S`, never in globals.
pub type ToolHandler<S> = Box<dyn Fn(&mut S, Value) -> Result<Value> + Send + Sync>;

/// Registry of available MCP tools.
///
/// The registry maintains a list of tool definitions for discovery and a
/// HashMap of tool names to their handler functions for execution.
pub struct ToolRegistry<S> {
    /// List of all registered tools (for tools/list method)
    pub tools: Vec<MCPTool>,
    /// Map of tool names to their handler functions (for tools/call method)
    pub handlers: HashMap<String, ToolHandler<S>>,
}

impl<S> ToolRegistry<S> {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    /// Register a tool with the registry.
    ///
    /// Registering a name twice replaces the earlier definition and handler.
    pub fn register(&mut self, tool: MCPTool, handler: ToolHandler<S>) {
        let name = tool.name.clone();
        self.tools.retain(|t| t.name != name);
        self.tools.push(tool);
        self.handlers.insert(name, handler);
    }

    /// Run the handler registered under `name` against `state`.
    pub fn call(&self, state: &mut S, name: &str, arguments: Value) -> Result<Value> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| Error::UnknownTool(name.to_string()))?;
        handler(state, arguments)
    }
}

impl<S> Default for ToolRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Initialize and register all tools.
///
/// Add new tool registrations here when implementing additional tools.
pub fn initialize_tools() -> ToolRegistry<ResultRecord> {
    let mut registry = ToolRegistry::new();
    tools::add::register(&mut registry);
    registry
}

/// Build the `CallToolResult` body carrying a single text item.
fn tool_result(text: String, is_error: bool) -> Value {
    json!({
        "content": [
            {
                "type": "text",
                "text": text
            }
        ],
        "isError": is_error
    })
}

/// Formatter matching the separators of Python's `json.dumps`: `", "` between
/// items and `": "` between a key and its value.
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> std::io::Result<()>
    where
        W: ?Sized + std::io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> std::io::Result<()>
    where
        W: ?Sized + std::io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> std::io::Result<()>
    where
        W: ?Sized + std::io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Encode a tool's return value as the text placed in its content item,
/// e.g. `{"result": 5}`.
pub fn to_text(value: &Value) -> Result<String> {
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    value.serialize(&mut serializer)?;
    String::from_utf8(buf)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
}

/// Pick the protocol version to answer `initialize` with.
pub fn negotiate_protocol_version(requested: Option<&str>) -> &'static str {
    requested
        .and_then(|v| SUPPORTED_PROTOCOL_VERSIONS.iter().find(|s| **s == v))
        .copied()
        .unwrap_or(LATEST_PROTOCOL_VERSION)
}

/// An MCP server session: metadata, registered tools and the state the tools
/// share across calls.
///
/// Requests are handled one at a time through `&mut self`, so tool state
/// is never mutated concurrently.
pub struct McpServer<S> {
    config: ServerConfig,
    registry: ToolRegistry<S>,
    state: S,
}

impl<S> McpServer<S> {
    pub fn new(config: ServerConfig, registry: ToolRegistry<S>, state: S) -> Self {
        Self {
            config,
            registry,
            state,
        }
    }

    /// Session state as left by the most recent tool call.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Handle one raw input line.
    ///
    /// Returns `None` when nothing should be written back (blank lines and
    /// notifications).
    pub fn handle_line(&mut self, line: &str) -> Option<MCPResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "parse error");
                return Some(MCPResponse::error(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {}", e),
                ));
            }
        };

        // Keep the id around so malformed requests can still be answered
        let id = value.get("id").cloned().unwrap_or(Value::Null);
        let request: MCPRequest = match serde_json::from_value(value) {
            Ok(req) => req,
            Err(e) => {
                warn!(error = %e, "invalid request");
                return Some(MCPResponse::error(
                    id,
                    INVALID_REQUEST,
                    format!("Invalid Request: {}", e),
                ));
            }
        };

        if request.jsonrpc != "2.0" {
            warn!(jsonrpc = %request.jsonrpc, "unsupported JSON-RPC version");
            return Some(MCPResponse::error(
                id,
                INVALID_REQUEST,
                format!("Invalid Request: unsupported jsonrpc version '{}'", request.jsonrpc),
            ));
        }

        self.handle_request(request)
    }

    /// Route a parsed request to its method handler.
    pub fn handle_request(&mut self, request: MCPRequest) -> Option<MCPResponse> {
        let MCPRequest {
            id, method, params, ..
        } = request;

        // Notifications are one-way messages that don't require responses
        let Some(id) = id else {
            debug!(method = %method, "notification");
            return None;
        };

        debug!(method = %method, id = %id, "request");
        let response = match method.as_str() {
            "initialize" => self.handle_initialize(id, params.as_ref()),
            "ping" => MCPResponse::success(id, json!({})),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, params),
            _ => MCPResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {}", method)),
        };
        Some(response)
    }

    /// Handle MCP initialize method.
    ///
    /// Returns the negotiated protocol version, server capabilities, and
    /// server information.
    fn handle_initialize(&self, id: Value, params: Option<&Value>) -> MCPResponse {
        let requested = params
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str);
        let version = negotiate_protocol_version(requested);
        info!(requested = ?requested, negotiated = version, "initialize");

        MCPResponse::success(
            id,
            json!({
                "protocolVersion": version,
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": self.config.name,
                    "version": self.config.version
                }
            }),
        )
    }

    /// Handle MCP tools/list method.
    fn handle_tools_list(&self, id: Value) -> MCPResponse {
        MCPResponse::success(id, json!({ "tools": self.registry.tools }))
    }

    /// Handle MCP tools/call method.
    ///
    /// Tool failures, unknown tool names included, are reported in-band with
    /// `isError: true`. Only malformed params become JSON-RPC errors.
    fn handle_tools_call(&mut self, id: Value, params: Option<Value>) -> MCPResponse {
        let Some(tool_params) = params else {
            return MCPResponse::error(id, INVALID_PARAMS, "Invalid params");
        };

        let Some(tool_name) = tool_params.get("name").and_then(Value::as_str) else {
            return MCPResponse::error(
                id,
                INVALID_PARAMS,
                "Invalid params: tool name must be a string",
            );
        };
        let arguments = tool_params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));

        let outcome = self
            .registry
            .call(&mut self.state, tool_name, arguments)
            .and_then(|result| to_text(&result));

        match outcome {
            Ok(text) => MCPResponse::success(id, tool_result(text, false)),
            Err(e) => {
                warn!(tool = tool_name, error = %e, "tool call failed");
                MCPResponse::success(id, tool_result(format!("Error: {}", e), true))
            }
        }
    }

    /// Serve requests line by line until `reader` reaches EOF.
    ///
    /// Each response is written as a single line and flushed immediately.
    /// Write failures end the loop with an error; lines that are not valid
    /// UTF-8 get a parse error and the loop keeps going.
    pub async fn serve<R, W>(&mut self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::with_capacity(1024);
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            let response = match std::str::from_utf8(&buf) {
                Ok(line) => self.handle_line(line),
                Err(e) => {
                    warn!(error = %e, "input line is not valid UTF-8");
                    Some(MCPResponse::error(
                        Value::Null,
                        PARSE_ERROR,
                        format!("Parse error: {}", e),
                    ))
                }
            };
            let Some(response) = response else {
                continue;
            };

            let response_json = match serde_json::to_string(&response) {
                Ok(json) => json,
                Err(e) => {
                    warn!(error = %e, "error serializing response");
                    continue;
                }
            };

            writer.write_all(response_json.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }

        debug!("input closed");
        Ok(())
    }
}

/// Run the MCP server in STDIO mode.
///
/// Reads JSON-RPC requests line-by-line from stdin and writes responses to
/// stdout. All logging goes to stderr so the protocol stream stays clean.
pub async fn run_server_stdio(config: ServerConfig) -> Result<()> {
    use tokio::io::{BufReader, BufWriter};

    info!(
        name = %config.name,
        version = %config.version,
        "MCP server starting (STDIO mode)"
    );

    let mut server = McpServer::new(config, initialize_tools(), ResultRecord::default());

    // 8KB buffers balance memory usage with I/O efficiency
    let stdin = BufReader::with_capacity(8192, tokio::io::stdin());
    let stdout = BufWriter::with_capacity(8192, tokio::io::stdout());
    server.serve(stdin, stdout).await?;

    info!(last_result = server.state().result, "MCP server stopped");
    Ok(())
}
