// crates/appscout-core/src/catalog.rs
// ============================================================================
// Module: Tool Catalog
// Description: Canonical MCP tool identifiers and definitions for Appscout.
// Purpose: Provide the tool listing surface answered without network calls.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! This module defines the canonical tool surface of the bridge. Definitions
//! carry JSON Schema input shapes and drive MCP `tools/list` responses; the
//! catalog is fixed at compile time and answered purely from memory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Tool Names
// ============================================================================

/// Canonical tool names exposed by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    /// Crawl a web application from a starting URL.
    Crawl,
    /// Search the upstream documentation index.
    DocSearch,
    /// Evaluate a selector against an application route.
    Evaluate,
    /// Persist a recorded flow object.
    PersistFlow,
    /// List persisted flows.
    ListFlows,
    /// Fetch a persisted flow by identifier.
    GetFlow,
}

impl ToolName {
    /// Returns the canonical string name for the tool.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Crawl => "crawl",
            Self::DocSearch => "doc_search",
            Self::Evaluate => "evaluate",
            Self::PersistFlow => "persist_flow",
            Self::ListFlows => "list_flows",
            Self::GetFlow => "get_flow",
        }
    }

    /// Returns all tool names in canonical listing order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Crawl,
            Self::DocSearch,
            Self::Evaluate,
            Self::PersistFlow,
            Self::ListFlows,
            Self::GetFlow,
        ]
    }

    /// Parses a tool name from its string representation.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "crawl" => Some(Self::Crawl),
            "doc_search" => Some(Self::DocSearch),
            "evaluate" => Some(Self::Evaluate),
            "persist_flow" => Some(Self::PersistFlow),
            "list_flows" => Some(Self::ListFlows),
            "get_flow" => Some(Self::GetFlow),
            _ => None,
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Tool Definitions
// ============================================================================

/// Tool definition shape used by MCP tool listings.
///
/// # Invariants
/// - `input_schema` is a JSON Schema payload for the tool input shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// MCP tool name.
    pub name: ToolName,
    /// Tool description for clients.
    pub description: String,
    /// JSON schema for tool input.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Returns the canonical tool definitions.
///
/// The order is intentional: it matches [`ToolName::all`] and is preserved in
/// tool listings to keep client diffs stable. Append new tools at the end.
#[must_use]
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        crawl_definition(),
        doc_search_definition(),
        evaluate_definition(),
        persist_flow_definition(),
        list_flows_definition(),
        get_flow_definition(),
    ]
}

/// Builds the tool definition for `crawl`.
fn crawl_definition() -> ToolDefinition {
    build_tool_definition(
        ToolName::Crawl,
        "Crawl a web application starting from an absolute URL and return the discovered route \
         map.",
        tool_input_schema(
            &json!({
                "url": schema_for_url("Absolute starting URL for the crawl."),
                "depth": {
                    "type": "integer",
                    "minimum": 0,
                    "maximum": 3,
                    "default": 1,
                    "description": "Link-follow depth (default 1, hard range 0-3)."
                }
            }),
            &["url"],
        ),
    )
}

/// Builds the tool definition for `doc_search`.
fn doc_search_definition() -> ToolDefinition {
    build_tool_definition(
        ToolName::DocSearch,
        "Search the upstream documentation index and return matching entries.",
        tool_input_schema(
            &json!({
                "query": schema_for_string("Search query text.")
            }),
            &["query"],
        ),
    )
}

/// Builds the tool definition for `evaluate`.
fn evaluate_definition() -> ToolDefinition {
    build_tool_definition(
        ToolName::Evaluate,
        "Evaluate a selector against an application route and report whether it resolves.",
        tool_input_schema(
            &json!({
                "selector": schema_for_string("CSS or XPath selector to evaluate."),
                "route": schema_for_string("Application route the selector is evaluated on.")
            }),
            &["selector", "route"],
        ),
    )
}

/// Builds the tool definition for `persist_flow`.
fn persist_flow_definition() -> ToolDefinition {
    build_tool_definition(
        ToolName::PersistFlow,
        "Persist a recorded flow object upstream; the flow shape is accepted as-is.",
        tool_input_schema(
            &json!({
                "flow": {
                    "type": "object",
                    "description": "Arbitrary flow object; forwarded without reshaping."
                }
            }),
            &["flow"],
        ),
    )
}

/// Builds the tool definition for `list_flows`.
fn list_flows_definition() -> ToolDefinition {
    build_tool_definition(
        ToolName::ListFlows,
        "List persisted flows.",
        tool_input_schema(&json!({}), &[]),
    )
}

/// Builds the tool definition for `get_flow`.
fn get_flow_definition() -> ToolDefinition {
    build_tool_definition(
        ToolName::GetFlow,
        "Fetch a persisted flow by identifier.",
        tool_input_schema(
            &json!({
                "id": schema_for_string("Flow identifier.")
            }),
            &["id"],
        ),
    )
}

// ============================================================================
// SECTION: Schema Helpers
// ============================================================================

/// Builds a tool definition from the provided schema payload.
#[must_use]
fn build_tool_definition(name: ToolName, description: &str, input_schema: Value) -> ToolDefinition {
    ToolDefinition {
        name,
        description: description.to_string(),
        input_schema,
    }
}

/// Builds a standard tool input schema wrapper.
#[must_use]
fn tool_input_schema(properties: &Value, required: &[&str]) -> Value {
    let required_values: Vec<Value> =
        required.iter().map(|value| Value::String((*value).to_string())).collect();
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": required_values,
        "properties": properties,
        "additionalProperties": true
    })
}

/// Returns a JSON schema for strings.
#[must_use]
fn schema_for_string(description: &str) -> Value {
    json!({
        "type": "string",
        "minLength": 1,
        "description": description
    })
}

/// Returns a JSON schema for absolute URLs.
#[must_use]
fn schema_for_url(description: &str) -> Value {
    json!({
        "type": "string",
        "format": "uri",
        "description": description
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
