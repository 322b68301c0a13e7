//! Shared types, adapter traits, and error types for the ipwarden IP
//! governance layer.
//!
//! This crate contains the foundational types shared between the core
//! crate and all adapter implementations. Keeping them in a separate
//! crate lets the adapters compile in parallel with the core and keeps
//! the dependency direction one-way: adapters depend on types, never on
//! the core.

pub mod cache_adapter;
pub mod error;
pub mod geo_adapter;
pub mod log_adapter;
pub mod prelude;
pub mod types;

// vim: ts=4
