// crates/appscout-core/src/lib.rs
// ============================================================================
// Module: Appscout Core
// Description: Tool catalog, registry, upstream client, and dispatch gateway.
// Purpose: Map validated tool invocations onto upstream REST requests.
// Dependencies: async-trait, reqwest, serde, serde_json, thiserror, url
// ============================================================================

//! ## Overview
//! Appscout Core contains the deduplicated heart of the bridge: a fixed tool
//! catalog, an immutable registry mapping tool names to input shapes and
//! request templates, an upstream HTTP client that classifies outcomes
//! instead of raising, and the dispatch gateway that turns every invocation
//! into a uniform [`ToolResult`] envelope. Tool inputs are untrusted and are
//! validated before any network call is made.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod catalog;
pub mod gateway;
pub mod registry;
pub mod upstream;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use catalog::ToolDefinition;
pub use catalog::ToolName;
pub use catalog::tool_definitions;
pub use gateway::DispatchError;
pub use gateway::DispatchGateway;
pub use gateway::ToolContent;
pub use gateway::ToolInvocation;
pub use gateway::ToolResult;
pub use registry::FieldKind;
pub use registry::FieldSpec;
pub use registry::FieldTarget;
pub use registry::HttpMethod;
pub use registry::RegistryError;
pub use registry::TemplateError;
pub use registry::ToolRegistry;
pub use registry::ToolSpec;
pub use registry::ValidatedArguments;
pub use registry::ValidationError;
pub use upstream::HttpUpstreamClient;
pub use upstream::UpstreamClient;
pub use upstream::UpstreamClientConfig;
pub use upstream::UpstreamInitError;
pub use upstream::UpstreamOutcome;
pub use upstream::UpstreamRequest;
