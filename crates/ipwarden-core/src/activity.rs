//! Per-address activity tracking.
//!
//! Every admitted request lands in an [`ActivityRecord`] under an
//! `ip:{address}` key with a fixed one-hour window: the TTL is armed by
//! the first request and never extended, so the record expires exactly
//! one hour after the window opened. The scanner feeds off snapshots of
//! these keys.

use std::sync::Arc;

use crate::prelude::*;
use ipwarden_types::cache_adapter::{ActivityRecord, CacheAdapter};

/// Window length for activity records, in seconds.
pub const ACTIVITY_TTL: u32 = 3600;

/// Key prefix of the activity family in the shared store.
pub const ACTIVITY_PREFIX: &str = "ip:";

pub fn activity_key(ip: &str) -> String {
	format!("{}{}", ACTIVITY_PREFIX, ip)
}

/// Address part of an activity key, `None` for keys outside the family.
/// Strips the prefix instead of splitting on ':' so IPv6 addresses
/// survive the round trip.
pub fn ip_from_key(key: &str) -> Option<&str> {
	key.strip_prefix(ACTIVITY_PREFIX)
}

/// Count this request and remember its path. Atomic per address via the
/// cache adapter; concurrent requests from one address never lose an
/// update.
pub async fn record_visit(
	cache: &Arc<dyn CacheAdapter>,
	ip: &str,
	path: &str,
) -> IwResult<ActivityRecord> {
	cache.record_visit(&activity_key(ip), path, ACTIVITY_TTL).await
}

/// Point-in-time snapshot of all live activity records, keyed by
/// address. Records that expire or turn unreadable between the key scan
/// and the reads are skipped, not errors.
pub async fn snapshot_all(
	cache: &Arc<dyn CacheAdapter>,
) -> IwResult<Vec<(Box<str>, ActivityRecord)>> {
	let keys = cache.keys_with_prefix(ACTIVITY_PREFIX).await?;
	let mut records = Vec::with_capacity(keys.len());

	for key in keys {
		let Some(ip) = ip_from_key(&key) else { continue };
		let raw = match cache.get(&key).await {
			Ok(Some(raw)) => raw,
			Ok(None) => continue,
			Err(err) => {
				warn!("Skipping unreadable activity record {}: {}", key, err);
				continue;
			}
		};
		match serde_json::from_str::<ActivityRecord>(&raw) {
			Ok(record) => records.push((ip.into(), record)),
			Err(err) => warn!("Dropping malformed activity record {}: {}", key, err),
		}
	}

	Ok(records)
}

#[cfg(test)]
mod tests {
	use super::*;
	use ipwarden_cache_adapter_memory::CacheAdapterMemory;

	#[test]
	fn key_round_trip() {
		assert_eq!(ip_from_key(&activity_key("10.0.0.5")), Some("10.0.0.5"));
		assert_eq!(ip_from_key("geo:10.0.0.5"), None);
	}

	#[test]
	fn key_round_trip_keeps_ipv6_intact() {
		let key = activity_key("2001:db8::1");
		assert_eq!(key, "ip:2001:db8::1");
		assert_eq!(ip_from_key(&key), Some("2001:db8::1"));
	}

	#[tokio::test]
	async fn record_visit_counts_and_collects_paths() {
		let cache: Arc<dyn CacheAdapter> = Arc::new(CacheAdapterMemory::new());

		let record = record_visit(&cache, "10.0.0.5", "/home").await.unwrap();
		assert_eq!(record.count, 1);
		let record = record_visit(&cache, "10.0.0.5", "/about").await.unwrap();
		let record_again = record_visit(&cache, "10.0.0.5", "/about").await.unwrap();

		assert_eq!(record.count, 2);
		assert_eq!(record_again.count, 3);
		assert_eq!(record_again.paths.len(), 2);
	}

	#[tokio::test]
	async fn snapshot_reflects_recorded_activity() {
		let cache: Arc<dyn CacheAdapter> = Arc::new(CacheAdapterMemory::new());
		record_visit(&cache, "10.0.0.5", "/home").await.unwrap();
		record_visit(&cache, "2001:db8::1", "/admin/users").await.unwrap();
		cache.set("geo:10.0.0.5", "{}", 60).await.unwrap();

		let mut snapshot = snapshot_all(&cache).await.unwrap();
		snapshot.sort_by(|a, b| a.0.cmp(&b.0));

		assert_eq!(snapshot.len(), 2);
		assert_eq!(snapshot[0].0.as_ref(), "10.0.0.5");
		assert_eq!(snapshot[1].0.as_ref(), "2001:db8::1");
		assert_eq!(snapshot[1].1.paths[0].as_ref(), "/admin/users");
	}

	#[tokio::test]
	async fn snapshot_of_empty_store_is_empty() {
		let cache: Arc<dyn CacheAdapter> = Arc::new(CacheAdapterMemory::new());
		assert!(snapshot_all(&cache).await.unwrap().is_empty());
	}
}

// vim: ts=4
