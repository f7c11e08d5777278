// crates/appscout-core/src/upstream/tests.rs
// ============================================================================
// Module: Upstream Client Unit Tests
// Description: Unit tests for client configuration and failure classification.
// Purpose: Validate outcome classification for unreachable upstreams.
// Dependencies: appscout-core, tokio, url
// ============================================================================

//! ## Overview
//! Covers client construction, default configuration, and classification of
//! network-level failures into typed outcomes instead of raised errors.

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

use url::Url;

use super::HttpUpstreamClient;
use super::UpstreamClient;
use super::UpstreamClientConfig;
use super::UpstreamOutcome;
use super::UpstreamRequest;
use crate::registry::HttpMethod;

// ============================================================================
// SECTION: Configuration Tests
// ============================================================================

#[test]
fn default_config_uses_thirty_second_timeout() {
    let config = UpstreamClientConfig::default();
    assert_eq!(config.timeout_ms, 30_000);
    assert!(!config.user_agent.is_empty());
}

#[test]
fn client_builds_from_default_config() {
    let config = UpstreamClientConfig::default();
    assert!(HttpUpstreamClient::new(&config).is_ok());
}

// ============================================================================
// SECTION: Classification Tests
// ============================================================================

#[tokio::test]
async fn unreachable_upstream_classifies_as_network_failure() {
    let config = UpstreamClientConfig {
        timeout_ms: 2_000,
        ..UpstreamClientConfig::default()
    };
    let client = HttpUpstreamClient::new(&config).expect("client builds");
    // Port 1 on loopback is expected to refuse connections.
    let request = UpstreamRequest {
        method: HttpMethod::Get,
        url: Url::parse("http://127.0.0.1:1/flows").expect("url parses"),
        body: None,
    };
    let outcome = client.send(&request).await;
    match outcome {
        UpstreamOutcome::Failure {
            status,
            message,
            raw_body,
        } => {
            assert_eq!(status, None);
            assert!(!message.is_empty());
            assert_eq!(raw_body, None);
        }
        UpstreamOutcome::Success {
            ..
        } => panic!("unreachable upstream must not succeed"),
    }
}
