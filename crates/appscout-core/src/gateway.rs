// crates/appscout-core/src/gateway.rs
// ============================================================================
// Module: Dispatch Gateway
// Description: Tool invocation dispatch and uniform result shaping.
// Purpose: Turn every invocation into a ToolResult, never raising past it.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The gateway is the boundary between the transport adapter and the rest of
//! the bridge. `dispatch` looks the tool up, validates arguments, builds the
//! upstream request, relays it, and shapes the outcome into a [`ToolResult`]
//! envelope. Every failure kind (unknown tool, validation, upstream HTTP or
//! network error, malformed body, internal fault) becomes a normal
//! error-flagged result; callers never receive a raised error for a single
//! tool call.
//!
//! ## Invariants
//! - `is_error` is true iff lookup, validation, or the upstream relay failed.
//! - Validation failures are reported before any network call is made.
//! - Exactly one upstream request is issued per invocation.
//! - The gateway holds no mutable state; concurrent dispatches never interact.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::catalog::ToolDefinition;
use crate::catalog::ToolName;
use crate::catalog::tool_definitions;
use crate::registry::ToolRegistry;
use crate::registry::ValidationError;
use crate::upstream::UpstreamClient;
use crate::upstream::UpstreamOutcome;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum characters of upstream body text echoed into diagnostics.
const MAX_DIAGNOSTIC_CHARS: usize = 2_048;

// ============================================================================
// SECTION: Invocation and Result Types
// ============================================================================

/// One request to execute a specific tool with specific arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Requested tool name, as supplied by the caller.
    pub tool_name: String,
    /// Raw JSON arguments.
    pub arguments: Value,
}

/// Tool output payloads carried in the result envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    /// Human-readable diagnostic text.
    Text {
        /// Diagnostic message.
        text: String,
    },
    /// Structured JSON tool output.
    Json {
        /// JSON payload relayed from upstream.
        json: Value,
    },
}

/// Uniform envelope returned for every invocation.
///
/// # Invariants
/// - Error results carry exactly one text content item.
/// - Success results carry exactly one JSON content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Ordered content items.
    pub content: Vec<ToolContent>,
    /// Whether the invocation failed.
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolResult {
    /// Builds a success envelope wrapping the upstream JSON body.
    #[must_use]
    pub fn success(json: Value) -> Self {
        Self {
            content: vec![ToolContent::Json {
                json,
            }],
            is_error: false,
        }
    }

    /// Builds an error envelope with a single diagnostic text item.
    #[must_use]
    pub fn error(text: String) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text,
            }],
            is_error: true,
        }
    }
}

// ============================================================================
// SECTION: Dispatch Errors
// ============================================================================

/// Internal dispatch failure taxonomy.
///
/// Converted into an error-flagged [`ToolResult`] at the gateway boundary;
/// never propagated to the transport adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Invocation names a tool not present in the registry.
    #[error("unknown tool {0}")]
    UnknownTool(String),
    /// Invocation arguments failed the declared input shape.
    #[error("{tool} invalid arguments: {source}")]
    Validation {
        /// Tool whose validation failed.
        tool: ToolName,
        /// First failing field and reason.
        source: ValidationError,
    },
    /// The upstream relay reported a failure of any kind.
    #[error("{tool} failed: {}", upstream_label(*status, diagnostic))]
    Upstream {
        /// Tool whose relay failed.
        tool: ToolName,
        /// HTTP status when a response was received.
        status: Option<u16>,
        /// Diagnostic text including any captured body.
        diagnostic: String,
    },
    /// An internal fault occurred while building or shaping the request.
    #[error("{tool} failed: internal error {detail}")]
    Internal {
        /// Tool whose dispatch faulted.
        tool: ToolName,
        /// Fault description.
        detail: String,
    },
}

/// Renders the `<status-or-"network error"> <diagnostic>` message tail.
fn upstream_label(status: Option<u16>, diagnostic: &str) -> String {
    status.map_or_else(
        || format!("network error {diagnostic}"),
        |code| format!("{code} {diagnostic}"),
    )
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// Request-scoped dispatch gateway; stateless between calls.
#[derive(Clone)]
pub struct DispatchGateway {
    /// Immutable tool registry.
    registry: Arc<ToolRegistry>,
    /// Upstream relay client.
    client: Arc<dyn UpstreamClient>,
    /// Upstream base URL all request templates join against.
    base_url: Url,
}

impl DispatchGateway {
    /// Creates a gateway over an explicit registry and upstream client.
    #[must_use]
    pub fn new(registry: ToolRegistry, client: Arc<dyn UpstreamClient>, base_url: Url) -> Self {
        Self {
            registry: Arc::new(registry),
            client,
            base_url,
        }
    }

    /// Returns the tool catalog for discovery; answered with no network calls.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        tool_definitions()
            .into_iter()
            .filter(|definition| self.registry.lookup(definition.name.as_str()).is_ok())
            .collect()
    }

    /// Dispatches one invocation and shapes the outcome into a [`ToolResult`].
    ///
    /// This function is infallible at the type level: every failure kind is
    /// folded into an error-flagged envelope.
    pub async fn dispatch(&self, invocation: &ToolInvocation) -> ToolResult {
        match self.try_dispatch(invocation).await {
            Ok(body) => ToolResult::success(body),
            Err(error) => ToolResult::error(error.to_string()),
        }
    }

    /// Runs the dispatch pipeline, surfacing failures as typed errors.
    async fn try_dispatch(&self, invocation: &ToolInvocation) -> Result<Value, DispatchError> {
        let spec = self
            .registry
            .lookup(&invocation.tool_name)
            .map_err(|_| DispatchError::UnknownTool(invocation.tool_name.clone()))?;
        let arguments = spec.validate(&invocation.arguments).map_err(|source| {
            DispatchError::Validation {
                tool: spec.name,
                source,
            }
        })?;
        let request =
            spec.build_request(&self.base_url, &arguments).map_err(|err| {
                DispatchError::Internal {
                    tool: spec.name,
                    detail: err.to_string(),
                }
            })?;
        match self.client.send(&request).await {
            UpstreamOutcome::Success {
                body, ..
            } => Ok(body),
            UpstreamOutcome::Failure {
                status,
                message,
                raw_body,
            } => Err(DispatchError::Upstream {
                tool: spec.name,
                status,
                diagnostic: diagnostic_text(&message, raw_body.as_deref()),
            }),
        }
    }
}

/// Combines the failure message with a bounded slice of the raw body.
fn diagnostic_text(message: &str, raw_body: Option<&str>) -> String {
    match raw_body {
        Some(raw) if !raw.is_empty() => {
            let bounded: String = raw.chars().take(MAX_DIAGNOSTIC_CHARS).collect();
            format!("{message}: {bounded}")
        }
        _ => message.to_string(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
