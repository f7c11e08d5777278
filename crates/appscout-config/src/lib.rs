// crates/appscout-config/src/lib.rs
// ============================================================================
// Module: Appscout Config Library
// Description: Canonical config model and fail-closed validation.
// Purpose: Single source of truth for appscout.toml semantics.
// Dependencies: serde, thiserror, toml, url
// ============================================================================

//! ## Overview
//! `appscout-config` defines the configuration model for the bridge: server
//! transport and bind settings plus the upstream base URL and timeout. Config
//! inputs are untrusted; loading applies strict size and path limits and
//! validation fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AppscoutConfig;
pub use config::ConfigError;
pub use config::ServerConfig;
pub use config::ServerTransport;
pub use config::UpstreamConfig;
