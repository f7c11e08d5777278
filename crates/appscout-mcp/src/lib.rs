// crates/appscout-mcp/src/lib.rs
// ============================================================================
// Module: Appscout MCP
// Description: MCP transport adapter over the dispatch gateway.
// Purpose: Expose the bridge tools via JSON-RPC 2.0 transports.
// Dependencies: appscout-config, appscout-core, axum, tokio
// ============================================================================

//! ## Overview
//! Appscout MCP exposes the bridge tools through JSON-RPC 2.0 over stdio,
//! HTTP, and SSE transports. All tool calls route through
//! [`appscout_core::DispatchGateway`]; a failed tool call is a normal response
//! with `isError` set, never a JSON-RPC error. Inbound payloads are untrusted
//! and size-limited before parsing.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod server;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::McpAuditEvent;
pub use audit::McpAuditEventParams;
pub use audit::McpAuditSink;
pub use audit::McpNoopAuditSink;
pub use audit::McpStderrAuditSink;
pub use server::McpServer;
pub use server::McpServerError;
pub use telemetry::MCP_LATENCY_BUCKETS_MS;
pub use telemetry::McpMethod;
pub use telemetry::McpMetricEvent;
pub use telemetry::McpMetrics;
pub use telemetry::McpOutcome;
pub use telemetry::NoopMetrics;
