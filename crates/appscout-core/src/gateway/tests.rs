// crates/appscout-core/src/gateway/tests.rs
// ============================================================================
// Module: Dispatch Gateway Unit Tests
// Description: Unit tests for dispatch ordering and result shaping.
// Purpose: Validate the uniform envelope and validation-before-network order.
// Dependencies: appscout-core, async-trait, serde_json, tokio, url
// ============================================================================

//! ## Overview
//! Dispatches invocations against a stub upstream client and asserts the
//! envelope shape, error classification, and that validation failures never
//! reach the network.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;
use url::Url;

use super::DispatchGateway;
use super::ToolContent;
use super::ToolInvocation;
use super::ToolResult;
use crate::catalog::ToolName;
use crate::registry::ToolRegistry;
use crate::upstream::UpstreamClient;
use crate::upstream::UpstreamOutcome;
use crate::upstream::UpstreamRequest;

// ============================================================================
// SECTION: Stub Client
// ============================================================================

/// Upstream stub returning a fixed outcome and counting calls.
struct StubClient {
    /// Outcome returned for every request.
    outcome: UpstreamOutcome,
    /// Number of requests received.
    calls: AtomicUsize,
}

impl StubClient {
    /// Creates a stub that always returns `outcome`.
    fn new(outcome: UpstreamOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: AtomicUsize::new(0),
        })
    }

    /// Number of requests the stub has received.
    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpstreamClient for StubClient {
    async fn send(&self, _request: &UpstreamRequest) -> UpstreamOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

/// Builds a gateway over the builtin registry and the given stub.
fn gateway_with(stub: Arc<StubClient>) -> DispatchGateway {
    let base_url = Url::parse("https://tools.example.com").expect("base url parses");
    DispatchGateway::new(ToolRegistry::builtin(), stub, base_url)
}

/// Extracts the single diagnostic text from an error result.
fn error_text(result: &ToolResult) -> &str {
    assert!(result.is_error);
    assert_eq!(result.content.len(), 1);
    match &result.content[0] {
        ToolContent::Text {
            text,
        } => text,
        ToolContent::Json {
            ..
        } => panic!("error results carry text content"),
    }
}

/// A success outcome wrapping `body`.
fn success(body: Value) -> UpstreamOutcome {
    UpstreamOutcome::Success {
        status: 200,
        body,
    }
}

// ============================================================================
// SECTION: Discovery Tests
// ============================================================================

#[test]
fn definitions_cover_the_builtin_catalog() {
    let stub = StubClient::new(success(json!({})));
    let gateway = gateway_with(Arc::clone(&stub));
    let definitions = gateway.definitions();
    assert_eq!(definitions.len(), ToolName::all().len());
    // Discovery never touches the upstream.
    assert_eq!(stub.call_count(), 0);
}

// ============================================================================
// SECTION: Dispatch Tests
// ============================================================================

#[tokio::test]
async fn unknown_tool_yields_error_envelope_without_network() {
    let stub = StubClient::new(success(json!({})));
    let gateway = gateway_with(Arc::clone(&stub));
    let invocation = ToolInvocation {
        tool_name: "nonexistent".to_string(),
        arguments: json!({}),
    };
    let result = gateway.dispatch(&invocation).await;
    assert!(error_text(&result).contains("nonexistent"));
    assert_eq!(stub.call_count(), 0);
}

#[tokio::test]
async fn validation_failure_yields_error_envelope_without_network() {
    let stub = StubClient::new(success(json!({})));
    let gateway = gateway_with(Arc::clone(&stub));
    let invocation = ToolInvocation {
        tool_name: "crawl".to_string(),
        arguments: json!({}),
    };
    let result = gateway.dispatch(&invocation).await;
    assert!(error_text(&result).contains("url"));
    assert_eq!(stub.call_count(), 0);
}

#[tokio::test]
async fn out_of_range_depth_never_reaches_the_upstream() {
    let stub = StubClient::new(success(json!({})));
    let gateway = gateway_with(Arc::clone(&stub));
    let invocation = ToolInvocation {
        tool_name: "crawl".to_string(),
        arguments: json!({ "url": "https://example.com", "depth": 7 }),
    };
    let result = gateway.dispatch(&invocation).await;
    assert!(result.is_error);
    assert_eq!(stub.call_count(), 0);
}

#[tokio::test]
async fn successful_relay_passes_the_body_through_unchanged() {
    let body = json!({ "routes": ["/login", "/cart"] });
    let stub = StubClient::new(success(body.clone()));
    let gateway = gateway_with(Arc::clone(&stub));
    let invocation = ToolInvocation {
        tool_name: "doc_search".to_string(),
        arguments: json!({ "query": "checkout" }),
    };
    let result = gateway.dispatch(&invocation).await;
    assert!(!result.is_error);
    assert_eq!(
        result.content,
        vec![ToolContent::Json {
            json: body,
        }]
    );
    assert_eq!(stub.call_count(), 1);
}

#[tokio::test]
async fn upstream_http_failure_names_the_tool_and_status() {
    let stub = StubClient::new(UpstreamOutcome::Failure {
        status: Some(500),
        message: "upstream returned error status".to_string(),
        raw_body: Some("boom".to_string()),
    });
    let gateway = gateway_with(Arc::clone(&stub));
    let invocation = ToolInvocation {
        tool_name: "persist_flow".to_string(),
        arguments: json!({ "flow": { "name": "checkout" } }),
    };
    let result = gateway.dispatch(&invocation).await;
    let text = error_text(&result);
    assert!(text.contains("persist_flow"));
    assert!(text.contains("500"));
    assert!(text.contains("boom"));
    assert_eq!(stub.call_count(), 1);
}

#[tokio::test]
async fn network_failure_is_labelled_without_a_status() {
    let stub = StubClient::new(UpstreamOutcome::Failure {
        status: None,
        message: "connection failed".to_string(),
        raw_body: None,
    });
    let gateway = gateway_with(Arc::clone(&stub));
    let invocation = ToolInvocation {
        tool_name: "list_flows".to_string(),
        arguments: json!({}),
    };
    let result = gateway.dispatch(&invocation).await;
    let text = error_text(&result);
    assert!(text.contains("list_flows"));
    assert!(text.contains("network error"));
    assert!(text.contains("connection failed"));
    assert_eq!(stub.call_count(), 1);
}

#[tokio::test]
async fn oversized_failure_bodies_are_bounded_in_diagnostics() {
    let stub = StubClient::new(UpstreamOutcome::Failure {
        status: Some(502),
        message: "upstream returned error status".to_string(),
        raw_body: Some("x".repeat(100_000)),
    });
    let gateway = gateway_with(Arc::clone(&stub));
    let invocation = ToolInvocation {
        tool_name: "get_flow".to_string(),
        arguments: json!({ "id": "flow-1" }),
    };
    let result = gateway.dispatch(&invocation).await;
    let text = error_text(&result);
    assert!(text.len() < 4_096);
    assert_eq!(stub.call_count(), 1);
}

#[tokio::test]
async fn valid_invocation_issues_exactly_one_request() {
    let stub = StubClient::new(success(json!({ "flows": [] })));
    let gateway = gateway_with(Arc::clone(&stub));
    let invocation = ToolInvocation {
        tool_name: "list_flows".to_string(),
        arguments: Value::Null,
    };
    let first = gateway.dispatch(&invocation).await;
    assert!(!first.is_error);
    assert_eq!(stub.call_count(), 1);
    let second = gateway.dispatch(&invocation).await;
    assert!(!second.is_error);
    assert_eq!(stub.call_count(), 2);
}
