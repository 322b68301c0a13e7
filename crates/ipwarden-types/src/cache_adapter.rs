//! Adapter for the shared expiring key-value store.
//!
//! The store backs three key families: `ip:{ip}` activity records,
//! `geo:{ip}` cached geolocation, and `rate:{class}:{identity}` rate
//! windows. Expiry is the store's job; callers never see expired
//! entries. Per-key mutations (`increment`, `record_visit`) must be
//! atomic: two concurrent callers on the same key may never lose an
//! update.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::prelude::*;

/// Per-IP activity inside one tracking window, stored as JSON under an
/// `ip:{ip}` key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ActivityRecord {
	/// Requests observed since the record was created
	pub count: u64,
	/// Distinct paths visited, in first-seen order
	pub paths: Vec<Box<str>>,
}

impl ActivityRecord {
	/// Merge `path` into the path set, preserving first-seen order.
	pub fn merge_path(&mut self, path: &str) {
		if !self.paths.iter().any(|p| p.as_ref() == path) {
			self.paths.push(path.into());
		}
	}
}

/// Result of an atomic counter increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
	/// Counter value after the increment
	pub count: u64,
	/// Seconds until the counter's window expires
	pub expires_in: u32,
}

#[async_trait]
pub trait CacheAdapter: Debug + Send + Sync {
	/// Read the raw value under `key`, if present and not expired.
	async fn get(&self, key: &str) -> IwResult<Option<Box<str>>>;

	/// Store `value` under `key`, arming expiry `ttl_secs` from now.
	/// Overwriting re-arms the expiry.
	async fn set(&self, key: &str, value: &str, ttl_secs: u32) -> IwResult<()>;

	/// Atomically increment the plain counter under `key`. A missing or
	/// expired counter is created at 1 with `ttl_secs`; the expiry of a
	/// live counter is left untouched, so the window is fixed from the
	/// first increment.
	async fn increment(&self, key: &str, ttl_secs: u32) -> IwResult<Counter>;

	/// Atomically increment the activity record under `key` and merge
	/// `path` into its path set. A missing or expired record is created
	/// with `ttl_secs`; the expiry of a live record is left untouched.
	/// Returns the updated record.
	async fn record_visit(&self, key: &str, path: &str, ttl_secs: u32)
		-> IwResult<ActivityRecord>;

	/// Keys currently live under `prefix`. Callers treat the result as a
	/// snapshot; slight staleness is acceptable.
	async fn keys_with_prefix(&self, prefix: &str) -> IwResult<Vec<Box<str>>>;

	/// Drop expired entries eagerly, returning how many were removed.
	/// Implementations that expire lazily on access use this as their
	/// periodic compaction hook.
	async fn purge_expired(&self) -> IwResult<usize>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn merge_path_deduplicates() {
		let mut record = ActivityRecord::default();
		record.merge_path("/home");
		record.merge_path("/about");
		record.merge_path("/home");
		assert_eq!(record.paths.len(), 2);
		assert_eq!(record.paths[0].as_ref(), "/home");
	}

	#[test]
	fn activity_record_json_shape() {
		let mut record = ActivityRecord { count: 3, paths: vec![] };
		record.merge_path("/login");
		let json = serde_json::to_string(&record).unwrap();
		assert_eq!(json, r#"{"count":3,"paths":["/login"]}"#);
	}
}

// vim: ts=4
