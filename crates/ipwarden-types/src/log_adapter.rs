//! Adapter for the durable stores behind the governance layer: the
//! request audit trail, the operator blocklist, and scanner findings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fmt::Debug;

use crate::prelude::*;

/// One request in the append-only audit trail. Created once per request
/// after geo enrichment, never mutated.
#[skip_serializing_none]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLogEntry {
	pub ip_address: Box<str>,
	pub timestamp: Timestamp,
	pub path: Box<str>,
	pub country: Option<Box<str>>,
	pub city: Option<Box<str>>,
}

/// Operator-managed blocklist entry. The request pipeline only ever
/// checks existence; duplicates for one address are harmless.
#[skip_serializing_none]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedEntry {
	pub ip_address: Box<str>,
	pub reason: Option<Box<str>>,
	pub created_at: Timestamp,
}

/// Scanner finding, unique per (ip_address, reason).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspiciousEntry {
	pub ip_address: Box<str>,
	pub reason: Box<str>,
	pub flagged_at: Timestamp,
}

#[async_trait]
pub trait LogAdapter: Debug + Send + Sync {
	/// Append one request to the audit trail.
	async fn append_request(&self, entry: &RequestLogEntry) -> IwResult<()>;

	/// Most recent audit trail entries, newest first.
	async fn list_requests(&self, limit: u32) -> IwResult<Vec<RequestLogEntry>>;

	/// Whether `ip` currently has a blocklist entry.
	async fn is_blocked(&self, ip: &str) -> IwResult<bool>;

	/// Add `ip` to the blocklist. Blocking an already blocked address is
	/// a no-op that keeps the original entry.
	async fn block(&self, ip: &str, reason: Option<&str>) -> IwResult<()>;

	/// Remove `ip` from the blocklist.
	async fn unblock(&self, ip: &str) -> IwResult<()>;

	/// All blocklist entries.
	async fn list_blocked(&self) -> IwResult<Vec<BlockedEntry>>;

	/// Record a scanner finding with create-if-absent semantics.
	/// Returns false when the same (ip, reason) pair already exists.
	async fn flag_suspicious(&self, ip: &str, reason: &str, flagged_at: Timestamp)
		-> IwResult<bool>;

	/// Scanner findings, optionally restricted to one address.
	async fn list_suspicious(&self, ip: Option<&str>) -> IwResult<Vec<SuspiciousEntry>>;
}

// vim: ts=4
