// crates/appscout-mcp/src/server.rs
// ============================================================================
// Module: MCP Server
// Description: MCP server implementations for stdio, HTTP, and SSE transports.
// Purpose: Expose the bridge tools via JSON-RPC 2.0.
// Dependencies: appscout-config, appscout-core, axum, tokio
// ============================================================================

//! ## Overview
//! The MCP server exposes the bridge tools using JSON-RPC 2.0. It supports
//! stdio, HTTP, and SSE transports and always routes calls through
//! [`appscout_core::DispatchGateway`]. A failed tool call is a successful
//! JSON-RPC response whose result carries `isError`; JSON-RPC errors are
//! reserved for protocol-level failures. Inbound payloads are untrusted and
//! size-limited before parsing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::convert::Infallible;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use appscout_config::AppscoutConfig;
use appscout_config::ServerTransport;
use appscout_core::DispatchGateway;
use appscout_core::HttpUpstreamClient;
use appscout_core::ToolDefinition;
use appscout_core::ToolInvocation;
use appscout_core::ToolName;
use appscout_core::ToolRegistry;
use appscout_core::UpstreamClientConfig;
use axum::Router;
use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Sse;
use axum::response::sse::Event;
use axum::routing::post;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use tokio_stream::wrappers::ReceiverStream;

use crate::audit::McpAuditEvent;
use crate::audit::McpAuditEventParams;
use crate::audit::McpAuditSink;
use crate::audit::McpStderrAuditSink;
use crate::telemetry::McpMethod;
use crate::telemetry::McpMetricEvent;
use crate::telemetry::McpMetrics;
use crate::telemetry::McpOutcome;
use crate::telemetry::NoopMetrics;

// ============================================================================
// SECTION: MCP Server
// ============================================================================

/// MCP server instance.
pub struct McpServer {
    /// Server configuration.
    config: AppscoutConfig,
    /// Shared handler state.
    state: Arc<ServerState>,
}

impl McpServer {
    /// Builds a new MCP server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when initialization fails.
    pub fn from_config(config: AppscoutConfig) -> Result<Self, McpServerError> {
        Self::from_config_with_sinks(config, Arc::new(McpStderrAuditSink), Arc::new(NoopMetrics))
    }

    /// Builds a new MCP server with explicit audit and metrics sinks.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when initialization fails.
    pub fn from_config_with_sinks(
        config: AppscoutConfig,
        audit: Arc<dyn McpAuditSink>,
        metrics: Arc<dyn McpMetrics>,
    ) -> Result<Self, McpServerError> {
        config.validate().map_err(|err| McpServerError::Config(err.to_string()))?;
        let client_config = UpstreamClientConfig {
            timeout_ms: config.upstream.timeout_ms,
            user_agent: config.upstream.user_agent.clone(),
        };
        let client = HttpUpstreamClient::new(&client_config)
            .map_err(|err| McpServerError::Init(err.to_string()))?;
        let base_url = config
            .upstream
            .parsed_base_url()
            .map_err(|err| McpServerError::Config(err.to_string()))?;
        let gateway = DispatchGateway::new(ToolRegistry::builtin(), Arc::new(client), base_url);
        let state = Arc::new(ServerState {
            gateway,
            audit,
            metrics,
            transport: config.server.transport,
            max_body_bytes: config.server.max_body_bytes,
        });
        Ok(Self {
            config,
            state,
        })
    }

    /// Serves requests using the configured transport.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when the server fails.
    pub async fn serve(self) -> Result<(), McpServerError> {
        match self.config.server.transport {
            ServerTransport::Stdio => serve_stdio(self.state).await,
            ServerTransport::Http => serve_http(&self.config, self.state).await,
            ServerTransport::Sse => serve_sse(&self.config, self.state).await,
        }
    }
}

/// Shared server state for all transports.
struct ServerState {
    /// Dispatch gateway for tool calls.
    gateway: DispatchGateway,
    /// Audit sink for request events.
    audit: Arc<dyn McpAuditSink>,
    /// Metrics sink for request counters and latencies.
    metrics: Arc<dyn McpMetrics>,
    /// Transport this server is configured for.
    transport: ServerTransport,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
}

// ============================================================================
// SECTION: Stdio Transport
// ============================================================================

/// Serves JSON-RPC requests over stdin/stdout until stdin closes.
///
/// Both the framed read and the framed write are blocking pipe I/O, so each
/// runs on a blocking task rather than the async runtime thread.
async fn serve_stdio(state: Arc<ServerState>) -> Result<(), McpServerError> {
    let mut reader = BufReader::new(std::io::stdin());
    let mut writer = std::io::stdout();
    loop {
        let max_body_bytes = state.max_body_bytes;
        let (returned_reader, read) = tokio::task::spawn_blocking(move || {
            let read = read_framed(&mut reader, max_body_bytes);
            (reader, read)
        })
        .await
        .map_err(|_| McpServerError::Transport("stdio reader task failed".to_string()))?;
        reader = returned_reader;
        let Some(bytes) = read? else {
            return Ok(());
        };
        let started = Instant::now();
        let handled = match serde_json::from_slice::<JsonRpcRequest>(&bytes) {
            Ok(request) => process_request(&state, request).await,
            Err(_) => invalid_request(Value::Null),
        };
        let payload = serialize_response(&handled.response);
        let response_bytes = payload.len();
        let (returned_writer, written) = tokio::task::spawn_blocking(move || {
            let written = write_framed(&mut writer, &payload);
            (writer, written)
        })
        .await
        .map_err(|_| McpServerError::Transport("stdio writer task failed".to_string()))?;
        writer = returned_writer;
        written?;
        record_request(&state, None, bytes.len(), response_bytes, started, &handled);
    }
}

// ============================================================================
// SECTION: HTTP and SSE Transports
// ============================================================================

/// Serves JSON-RPC requests over HTTP.
async fn serve_http(config: &AppscoutConfig, state: Arc<ServerState>) -> Result<(), McpServerError> {
    let addr = bind_addr(config)?;
    let app = Router::new().route("/rpc", post(handle_http)).with_state(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|_| McpServerError::Transport("http bind failed".to_string()))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(|_| McpServerError::Transport("http server failed".to_string()))
}

/// Serves JSON-RPC requests over SSE.
async fn serve_sse(config: &AppscoutConfig, state: Arc<ServerState>) -> Result<(), McpServerError> {
    let addr = bind_addr(config)?;
    let app = Router::new().route("/rpc", post(handle_sse)).with_state(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|_| McpServerError::Transport("sse bind failed".to_string()))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(|_| McpServerError::Transport("sse server failed".to_string()))
}

/// Parses the configured bind address.
fn bind_addr(config: &AppscoutConfig) -> Result<SocketAddr, McpServerError> {
    config
        .server
        .bind
        .trim()
        .parse()
        .map_err(|_| McpServerError::Config("invalid bind address".to_string()))
}

/// Handles HTTP JSON-RPC requests.
async fn handle_http(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    bytes: Bytes,
) -> impl IntoResponse {
    let started = Instant::now();
    let handled = parse_request(&state, &bytes).await;
    let payload = serialize_response(&handled.response);
    record_request(&state, Some(peer.ip().to_string()), bytes.len(), payload.len(), started, &handled);
    (handled.status, axum::Json(handled.response))
}

/// Handles SSE JSON-RPC requests.
async fn handle_sse(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    bytes: Bytes,
) -> impl IntoResponse {
    let started = Instant::now();
    let handled = parse_request(&state, &bytes).await;
    let payload = serialize_response(&handled.response);
    record_request(&state, Some(peer.ip().to_string()), bytes.len(), payload.len(), started, &handled);
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Event, Infallible>>(1);
    let text = String::from_utf8_lossy(&payload).into_owned();
    let _ = tx.send(Ok(Event::default().data(text))).await;
    Sse::new(ReceiverStream::new(rx))
}

// ============================================================================
// SECTION: JSON-RPC Handling
// ============================================================================

/// Incoming JSON-RPC request payload.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    jsonrpc: String,
    /// Request identifier.
    id: Value,
    /// Method name.
    method: String,
    /// Optional parameters payload.
    params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    jsonrpc: &'static str,
    /// Request identifier.
    id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error payload.
#[derive(Debug, Serialize)]
struct JsonRpcError {
    /// Error code.
    code: i64,
    /// Human-readable error message.
    message: String,
}

/// Tool call parameters for JSON-RPC requests.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Raw JSON arguments; absent arguments validate as an empty object.
    #[serde(default)]
    arguments: Value,
}

/// Tool list response payload.
#[derive(Debug, Serialize)]
struct ToolListResult {
    /// Registered tool definitions.
    tools: Vec<ToolDefinition>,
}

/// Fully handled request with metadata for audit and metrics.
struct Handled {
    /// HTTP status for HTTP/SSE transports.
    status: StatusCode,
    /// JSON-RPC response envelope.
    response: JsonRpcResponse,
    /// Method classification.
    method: McpMethod,
    /// Tool name when the request was a recognizable tool call.
    tool: Option<ToolName>,
    /// Request outcome.
    outcome: McpOutcome,
    /// JSON-RPC error code when present.
    error_code: Option<i64>,
}

/// Parses and validates a JSON-RPC request payload.
async fn parse_request(state: &ServerState, bytes: &Bytes) -> Handled {
    if bytes.len() > state.max_body_bytes {
        return protocol_error(
            Value::Null,
            StatusCode::PAYLOAD_TOO_LARGE,
            -32070,
            "request body too large",
            McpMethod::Invalid,
        );
    }
    match serde_json::from_slice::<JsonRpcRequest>(bytes.as_ref()) {
        Ok(request) => process_request(state, request).await,
        Err(_) => invalid_request(Value::Null),
    }
}

/// Dispatches a JSON-RPC request to the gateway.
async fn process_request(state: &ServerState, request: JsonRpcRequest) -> Handled {
    if request.jsonrpc != "2.0" {
        return invalid_request(request.id);
    }
    match request.method.as_str() {
        "tools/list" => {
            let tools = state.gateway.definitions();
            match serde_json::to_value(ToolListResult {
                tools,
            }) {
                Ok(value) => ok_response(request.id, value, McpMethod::ToolsList, None),
                Err(_) => serialization_error(request.id, McpMethod::ToolsList),
            }
        }
        "tools/call" => {
            let id = request.id;
            let params = request.params.unwrap_or(Value::Null);
            match serde_json::from_value::<ToolCallParams>(params) {
                Ok(call) => {
                    let tool = ToolName::parse(&call.name);
                    let invocation = ToolInvocation {
                        tool_name: call.name,
                        arguments: call.arguments,
                    };
                    let result = state.gateway.dispatch(&invocation).await;
                    let outcome =
                        if result.is_error { McpOutcome::Error } else { McpOutcome::Ok };
                    match serde_json::to_value(result) {
                        Ok(value) => Handled {
                            status: StatusCode::OK,
                            response: JsonRpcResponse {
                                jsonrpc: "2.0",
                                id,
                                result: Some(value),
                                error: None,
                            },
                            method: McpMethod::ToolsCall,
                            tool,
                            outcome,
                            error_code: None,
                        },
                        Err(_) => serialization_error(id, McpMethod::ToolsCall),
                    }
                }
                Err(_) => protocol_error(
                    id,
                    StatusCode::BAD_REQUEST,
                    -32602,
                    "invalid tool params",
                    McpMethod::ToolsCall,
                ),
            }
        }
        _ => protocol_error(
            request.id,
            StatusCode::BAD_REQUEST,
            -32601,
            "method not found",
            McpMethod::Other,
        ),
    }
}

/// Builds a successful JSON-RPC response.
fn ok_response(id: Value, value: Value, method: McpMethod, tool: Option<ToolName>) -> Handled {
    Handled {
        status: StatusCode::OK,
        response: JsonRpcResponse {
            jsonrpc: "2.0",
            id,
            result: Some(value),
            error: None,
        },
        method,
        tool,
        outcome: McpOutcome::Ok,
        error_code: None,
    }
}

/// Builds the standard invalid-request response.
fn invalid_request(id: Value) -> Handled {
    protocol_error(
        id,
        StatusCode::BAD_REQUEST,
        -32600,
        "invalid json-rpc request",
        McpMethod::Invalid,
    )
}

/// Builds a serialization-failure response.
fn serialization_error(id: Value, method: McpMethod) -> Handled {
    protocol_error(id, StatusCode::OK, -32060, "serialization failed", method)
}

/// Builds a protocol-level JSON-RPC error response.
fn protocol_error(
    id: Value,
    status: StatusCode,
    code: i64,
    message: &str,
    method: McpMethod,
) -> Handled {
    Handled {
        status,
        response: JsonRpcResponse {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.to_string(),
            }),
        },
        method,
        tool: None,
        outcome: McpOutcome::Error,
        error_code: Some(code),
    }
}

/// Serializes a response, falling back to a fixed error payload.
fn serialize_response(response: &JsonRpcResponse) -> Vec<u8> {
    serde_json::to_vec(response).unwrap_or_else(|_| {
        b"{\"jsonrpc\":\"2.0\",\"id\":null,\"error\":{\"code\":-32060,\"message\":\"serialization failed\"}}"
            .to_vec()
    })
}

/// Records audit and metric events for one handled request.
fn record_request(
    state: &ServerState,
    peer_ip: Option<String>,
    request_bytes: usize,
    response_bytes: usize,
    started: Instant,
    handled: &Handled,
) {
    let request_id = match &handled.response.id {
        Value::Null => None,
        id => Some(id.to_string()),
    };
    let event = McpAuditEvent::new(McpAuditEventParams {
        request_id,
        transport: state.transport,
        peer_ip,
        method: handled.method,
        tool: handled.tool,
        outcome: handled.outcome,
        error_code: handled.error_code,
        request_bytes,
        response_bytes,
    });
    state.audit.record(&event);
    let metric = McpMetricEvent {
        transport: state.transport,
        method: handled.method,
        tool: handled.tool,
        outcome: handled.outcome,
        error_code: handled.error_code,
        request_bytes,
        response_bytes,
    };
    state.metrics.record_request(metric.clone());
    state.metrics.record_latency(metric, started.elapsed());
}

// ============================================================================
// SECTION: Framing Helpers
// ============================================================================

/// Reads a framed stdio payload using MCP Content-Length headers.
///
/// Returns `Ok(None)` when stdin closes cleanly between frames.
fn read_framed(
    reader: &mut BufReader<impl Read>,
    max_body_bytes: usize,
) -> Result<Option<Vec<u8>>, McpServerError> {
    let mut content_length: Option<usize> = None;
    let mut line = String::new();
    loop {
        line.clear();
        let bytes = reader
            .read_line(&mut line)
            .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
        if bytes == 0 {
            if content_length.is_some() {
                return Err(McpServerError::Transport("stdio closed mid-frame".to_string()));
            }
            return Ok(None);
        }
        if line.trim().is_empty() {
            break;
        }
        if let Some(value) = line.strip_prefix("Content-Length:") {
            let parsed = value
                .trim()
                .parse::<usize>()
                .map_err(|_| McpServerError::Transport("invalid content length".to_string()))?;
            content_length = Some(parsed);
        }
    }
    let len = content_length
        .ok_or_else(|| McpServerError::Transport("missing content length".to_string()))?;
    if len > max_body_bytes {
        return Err(McpServerError::Transport("payload too large".to_string()));
    }
    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
    Ok(Some(buf))
}

/// Writes a framed stdio payload using MCP Content-Length headers.
fn write_framed(writer: &mut impl Write, payload: &[u8]) -> Result<(), McpServerError> {
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());
    writer
        .write_all(header.as_bytes())
        .map_err(|_| McpServerError::Transport("stdio write failed".to_string()))?;
    writer
        .write_all(payload)
        .map_err(|_| McpServerError::Transport("stdio write failed".to_string()))?;
    writer.flush().map_err(|_| McpServerError::Transport("stdio write failed".to_string()))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// MCP server errors.
#[derive(Debug, thiserror::Error)]
pub enum McpServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
