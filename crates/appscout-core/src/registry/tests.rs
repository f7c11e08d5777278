// crates/appscout-core/src/registry/tests.rs
// ============================================================================
// Module: Tool Registry Unit Tests
// Description: Unit tests for registration, validation, and request building.
// Purpose: Validate fail-closed argument checks and template determinism.
// Dependencies: appscout-core, proptest, serde_json, url
// ============================================================================

//! ## Overview
//! Exercises registry lookup discipline, field validation edge cases, and the
//! property that built requests match the canonical route table exactly.

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

use proptest::prelude::Strategy;
use proptest::prelude::any;
use proptest::prelude::prop_oneof;
use proptest::proptest;
use serde_json::Value;
use serde_json::json;
use url::Url;

use super::HttpMethod;
use super::RegistryError;
use super::ToolRegistry;
use super::ValidationError;
use crate::catalog::ToolName;

/// Test upstream base URL.
fn base_url() -> Url {
    Url::parse("https://tools.example.com").expect("base url parses")
}

// ============================================================================
// SECTION: Registry Tests
// ============================================================================

#[test]
fn builtin_registry_covers_every_tool() {
    let registry = ToolRegistry::builtin();
    assert_eq!(registry.len(), ToolName::all().len());
    for tool in ToolName::all() {
        assert!(registry.lookup(tool.as_str()).is_ok());
    }
}

#[test]
fn lookup_rejects_unknown_tool() {
    let registry = ToolRegistry::builtin();
    let err = registry.lookup("nonexistent").expect_err("lookup must fail");
    assert_eq!(err, RegistryError::UnknownTool("nonexistent".to_string()));
}

#[test]
fn register_rejects_duplicate_names() {
    let mut registry = ToolRegistry::new();
    let spec = ToolRegistry::builtin()
        .lookup("crawl")
        .expect("crawl is builtin")
        .clone();
    registry.register(spec.clone()).expect("first registration succeeds");
    let err = registry.register(spec).expect_err("duplicate must fail");
    assert_eq!(err, RegistryError::DuplicateTool(ToolName::Crawl));
}

// ============================================================================
// SECTION: Validation Tests
// ============================================================================

#[test]
fn crawl_requires_url() {
    let registry = ToolRegistry::builtin();
    let spec = registry.lookup("crawl").expect("crawl is builtin");
    let err = spec.validate(&json!({})).expect_err("missing url must fail");
    assert_eq!(err, ValidationError::MissingField("url"));
}

#[test]
fn crawl_rejects_relative_url() {
    let registry = ToolRegistry::builtin();
    let spec = registry.lookup("crawl").expect("crawl is builtin");
    let err = spec
        .validate(&json!({ "url": "/relative/path" }))
        .expect_err("relative url must fail");
    assert!(matches!(err, ValidationError::InvalidField { field: "url", .. }));
}

#[test]
fn crawl_depth_out_of_range_fails_rather_than_clamping() {
    let registry = ToolRegistry::builtin();
    let spec = registry.lookup("crawl").expect("crawl is builtin");
    let err = spec
        .validate(&json!({ "url": "https://example.com", "depth": 7 }))
        .expect_err("depth 7 must fail");
    assert!(matches!(err, ValidationError::InvalidField { field: "depth", .. }));
}

#[test]
fn crawl_depth_defaults_when_absent() {
    let registry = ToolRegistry::builtin();
    let spec = registry.lookup("crawl").expect("crawl is builtin");
    let validated =
        spec.validate(&json!({ "url": "https://example.com" })).expect("valid arguments");
    assert_eq!(validated.get("depth"), Some(&Value::from(1)));
}

#[test]
fn crawl_depth_null_is_a_type_failure_not_a_default() {
    let registry = ToolRegistry::builtin();
    let spec = registry.lookup("crawl").expect("crawl is builtin");
    let err = spec
        .validate(&json!({ "url": "https://example.com", "depth": null }))
        .expect_err("explicit null must fail");
    assert!(matches!(err, ValidationError::InvalidField { field: "depth", .. }));
}

#[test]
fn unknown_argument_fields_are_ignored() {
    let registry = ToolRegistry::builtin();
    let spec = registry.lookup("doc_search").expect("doc_search is builtin");
    let validated = spec
        .validate(&json!({ "query": "login", "future_field": { "nested": true } }))
        .expect("unknown fields are ignored");
    assert!(!validated.contains_key("future_field"));
}

#[test]
fn doc_search_rejects_empty_query() {
    let registry = ToolRegistry::builtin();
    let spec = registry.lookup("doc_search").expect("doc_search is builtin");
    let err = spec.validate(&json!({ "query": "" })).expect_err("empty query must fail");
    assert!(matches!(err, ValidationError::InvalidField { field: "query", .. }));
}

#[test]
fn persist_flow_rejects_non_object_flow() {
    let registry = ToolRegistry::builtin();
    let spec = registry.lookup("persist_flow").expect("persist_flow is builtin");
    let err = spec.validate(&json!({ "flow": "not-an-object" })).expect_err("must fail");
    assert!(matches!(err, ValidationError::InvalidField { field: "flow", .. }));
}

#[test]
fn null_arguments_are_an_empty_object() {
    let registry = ToolRegistry::builtin();
    let list = registry.lookup("list_flows").expect("list_flows is builtin");
    assert!(list.validate(&Value::Null).is_ok());
    let crawl = registry.lookup("crawl").expect("crawl is builtin");
    assert_eq!(
        crawl.validate(&Value::Null).expect_err("url still required"),
        ValidationError::MissingField("url")
    );
}

#[test]
fn array_arguments_are_rejected() {
    let registry = ToolRegistry::builtin();
    let spec = registry.lookup("list_flows").expect("list_flows is builtin");
    let err = spec.validate(&json!([1, 2])).expect_err("arrays are not argument maps");
    assert_eq!(err, ValidationError::NotAnObject);
}

// ============================================================================
// SECTION: Request Building Tests
// ============================================================================

#[test]
fn crawl_request_carries_url_and_depth_in_query() {
    let registry = ToolRegistry::builtin();
    let spec = registry.lookup("crawl").expect("crawl is builtin");
    let validated = spec
        .validate(&json!({ "url": "https://example.com/app", "depth": 2 }))
        .expect("valid arguments");
    let request = spec.build_request(&base_url(), &validated).expect("request builds");
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.url.path(), "/crawl");
    assert_eq!(
        request.url.query(),
        Some("url=https%3A%2F%2Fexample.com%2Fapp&depth=2")
    );
    assert_eq!(request.body, None);
}

#[test]
fn persist_flow_body_is_the_flow_verbatim() {
    let registry = ToolRegistry::builtin();
    let spec = registry.lookup("persist_flow").expect("persist_flow is builtin");
    let flow = json!({ "name": "checkout", "steps": [{ "click": "#buy" }] });
    let validated = spec.validate(&json!({ "flow": flow })).expect("valid arguments");
    let request = spec.build_request(&base_url(), &validated).expect("request builds");
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.url.path(), "/persist_flow");
    assert_eq!(request.url.query(), None);
    assert_eq!(request.body, Some(flow));
}

#[test]
fn get_flow_id_is_encoded_into_the_path() {
    let registry = ToolRegistry::builtin();
    let spec = registry.lookup("get_flow").expect("get_flow is builtin");
    let validated = spec.validate(&json!({ "id": "flow 42" })).expect("valid arguments");
    let request = spec.build_request(&base_url(), &validated).expect("request builds");
    assert_eq!(request.url.path(), "/flows/flow%2042");
    assert_eq!(request.url.query(), None);
    assert_eq!(request.body, None);
}

#[test]
fn base_url_with_prefix_path_is_preserved() {
    let base = Url::parse("https://tools.example.com/api/v1/").expect("base url parses");
    let registry = ToolRegistry::builtin();
    let spec = registry.lookup("list_flows").expect("list_flows is builtin");
    let validated = spec.validate(&json!({})).expect("valid arguments");
    let request = spec.build_request(&base, &validated).expect("request builds");
    assert_eq!(request.url.path(), "/api/v1/flows");
}

// ============================================================================
// SECTION: Route Table Property
// ============================================================================

/// Strategy for non-empty text arguments.
fn text_argument() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 /#.-]{1,24}"
}

/// Strategy for a valid invocation per tool, paired with expectations.
fn valid_arguments(tool: ToolName) -> impl Strategy<Value = Value> {
    match tool {
        ToolName::Crawl => prop_oneof![
            (0_i64..=3).prop_map(|depth| json!({ "url": "https://example.com", "depth": depth })),
            proptest::strategy::Just(json!({ "url": "https://example.com" })),
        ]
        .boxed(),
        ToolName::DocSearch => {
            text_argument().prop_map(|query| json!({ "query": query })).boxed()
        }
        ToolName::Evaluate => (text_argument(), text_argument())
            .prop_map(|(selector, route)| json!({ "selector": selector, "route": route }))
            .boxed(),
        ToolName::PersistFlow => (text_argument(), any::<bool>())
            .prop_map(|(name, flag)| json!({ "flow": { "name": name, "draft": flag } }))
            .boxed(),
        ToolName::ListFlows => proptest::strategy::Just(json!({})).boxed(),
        ToolName::GetFlow => text_argument().prop_map(|id| json!({ "id": id })).boxed(),
    }
}

/// Strategy pairing each builtin tool with valid arguments for it.
fn tool_and_arguments() -> impl Strategy<Value = (ToolName, Value)> {
    (0_usize..ToolName::all().len()).prop_flat_map(|index| {
        let tool = ToolName::all()[index];
        valid_arguments(tool).prop_map(move |arguments| (tool, arguments))
    })
}

proptest! {
    #[test]
    fn built_requests_match_the_route_table((tool, arguments) in tool_and_arguments()) {
        let registry = ToolRegistry::builtin();
        let spec = registry.lookup(tool.as_str()).expect("tool is builtin");
        let validated = spec.validate(&arguments).expect("arguments are valid");
        let request = spec.build_request(&base_url(), &validated).expect("request builds");

        // Method and path come straight from the table.
        let (method, path_prefix, query_fields, has_body) = match tool {
            ToolName::Crawl => (HttpMethod::Post, "/crawl", vec!["url", "depth"], false),
            ToolName::DocSearch => (HttpMethod::Get, "/doc_search", vec!["query"], false),
            ToolName::Evaluate => {
                (HttpMethod::Get, "/evaluate", vec!["selector", "route"], false)
            }
            ToolName::PersistFlow => (HttpMethod::Post, "/persist_flow", vec![], true),
            ToolName::ListFlows => (HttpMethod::Get, "/flows", vec![], false),
            ToolName::GetFlow => (HttpMethod::Get, "/flows/", vec![], false),
        };
        assert_eq!(request.method, method);
        assert!(request.url.path().starts_with(path_prefix));
        let actual_keys: Vec<String> = request
            .url
            .query_pairs()
            .map(|(key, _)| key.into_owned())
            .collect();
        let expected_keys: Vec<String> =
            query_fields.iter().map(ToString::to_string).collect();
        assert_eq!(actual_keys, expected_keys);
        assert_eq!(request.body.is_some(), has_body);
    }
}
