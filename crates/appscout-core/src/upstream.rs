// crates/appscout-core/src/upstream.rs
// ============================================================================
// Module: Upstream Client
// Description: Outbound HTTP relay against the configured upstream API.
// Purpose: Classify every HTTP outcome into a typed result, never raising.
// Dependencies: async-trait, reqwest, serde_json, thiserror, url
// ============================================================================

//! ## Overview
//! The upstream client issues exactly one HTTP request per call and maps the
//! result into [`UpstreamOutcome`]. Non-2xx statuses, network-level errors,
//! and malformed 2xx bodies all become `Failure` values; callers receive a
//! typed outcome, not a raised error. There are no retries and no implicit
//! request duplication.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::registry::HttpMethod;

// ============================================================================
// SECTION: Request and Outcome Types
// ============================================================================

/// Fully built upstream request; never mutated once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    /// HTTP method from the request template.
    pub method: HttpMethod,
    /// Full request URL including encoded query parameters.
    pub url: Url,
    /// Optional JSON request body.
    pub body: Option<Value>,
}

/// Classified result of one upstream request.
///
/// # Invariants
/// - `Success` always carries a parsed JSON body.
/// - `Failure.status` is `None` only for network-level failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamOutcome {
    /// Upstream responded with a 2xx status and a JSON body.
    Success {
        /// HTTP status code.
        status: u16,
        /// Parsed response body.
        body: Value,
    },
    /// The request failed or the response was unusable.
    Failure {
        /// HTTP status code when a response was received.
        status: Option<u16>,
        /// Human-readable failure description.
        message: String,
        /// Raw response body text when available, for diagnostics.
        raw_body: Option<String>,
    },
}

// ============================================================================
// SECTION: Client Trait
// ============================================================================

/// Outbound relay seam; implementations classify rather than raise.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Issues the request and classifies the outcome.
    async fn send(&self, request: &UpstreamRequest) -> UpstreamOutcome;
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the reqwest-backed upstream client.
///
/// # Invariants
/// - `timeout_ms` applies to the full request lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamClientConfig {
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl Default for UpstreamClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            user_agent: "appscout/0.1".to_string(),
        }
    }
}

// ============================================================================
// SECTION: HTTP Implementation
// ============================================================================

/// Upstream client backed by a shared reqwest connection pool.
#[derive(Debug, Clone)]
pub struct HttpUpstreamClient {
    /// HTTP client used for outbound requests.
    client: reqwest::Client,
}

impl HttpUpstreamClient {
    /// Creates a new upstream client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamInitError`] when the HTTP client cannot be built.
    pub fn new(config: &UpstreamClientConfig) -> Result<Self, UpstreamInitError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|_| UpstreamInitError::ClientBuild)?;
        Ok(Self {
            client,
        })
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstreamClient {
    async fn send(&self, request: &UpstreamRequest) -> UpstreamOutcome {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(request.url.clone()),
            HttpMethod::Post => self.client.post(request.url.clone()),
        };
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => return network_failure(&err),
        };
        let status = response.status().as_u16();
        let success = response.status().is_success();
        let text = match response.text().await {
            Ok(text) => text,
            Err(_) => {
                return UpstreamOutcome::Failure {
                    status: Some(status),
                    message: "failed to read response body".to_string(),
                    raw_body: None,
                };
            }
        };
        if !success {
            return UpstreamOutcome::Failure {
                status: Some(status),
                message: "upstream returned error status".to_string(),
                raw_body: Some(text),
            };
        }
        // Malformed 2xx bodies are surfaced as failures, not passed through.
        match serde_json::from_str::<Value>(&text) {
            Ok(body) => UpstreamOutcome::Success {
                status,
                body,
            },
            Err(_) => UpstreamOutcome::Failure {
                status: Some(status),
                message: "upstream response was not valid JSON".to_string(),
                raw_body: Some(text),
            },
        }
    }
}

/// Maps a network-level reqwest error into a failure outcome.
fn network_failure(err: &reqwest::Error) -> UpstreamOutcome {
    let message = if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        "connection failed".to_string()
    } else {
        err.to_string()
    };
    UpstreamOutcome::Failure {
        status: None,
        message,
        raw_body: None,
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Upstream client construction errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UpstreamInitError {
    /// The underlying HTTP client could not be built.
    #[error("http client build failed")]
    ClientBuild,
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
