//! ipwarden is a per-request IP governance layer for axum services.
//!
//! # Features
//!
//! - Request pipeline
//!     - client address resolution (direct or behind a trusted proxy)
//!     - blocklist enforcement with a fixed 403
//!     - per-address activity counters in fixed one-hour windows
//!     - TTL-cached geolocation enrichment
//!     - durable request audit trail
//! - Rate limiting
//!     - fixed windows keyed by authenticated user or client address
//!     - separate authenticated and anonymous quotas
//! - Anomaly scanning
//!     - scheduled sweep over recent activity
//!     - volume and sensitive-path detections, persisted once per reason
//! - Pluggable storage
//!     - expiring cache, durable log, and geolocation provider behind
//!       adapter traits

// Re-export shared types and adapter traits from ipwarden-types
pub use ipwarden_types::cache_adapter;
pub use ipwarden_types::error;
pub use ipwarden_types::geo_adapter;
pub use ipwarden_types::log_adapter;
pub use ipwarden_types::types;

// Governance layer re-exports
pub use ipwarden_core::activity;
pub use ipwarden_core::block;
pub use ipwarden_core::client_ip;
pub use ipwarden_core::extract;
pub use ipwarden_core::geo;
pub use ipwarden_core::maintenance;
pub use ipwarden_core::middleware;
pub use ipwarden_core::rate_limit;
pub use ipwarden_core::scanner;
pub use ipwarden_core::scheduler;

// Local modules
pub mod app;
pub mod prelude;
pub mod routes;
pub mod webserver;

pub use crate::app::{App, AppBuilder};

// vim: ts=4
