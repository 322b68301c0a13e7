//! In-process implementation of the expiring key-value store.
//!
//! Entries expire lazily: reads treat a stale entry as absent, and the
//! periodic [`purge_expired`](CacheAdapter::purge_expired) pass reclaims
//! the memory. All mutations run under one mutex, which is what makes
//! `increment` and `record_visit` linearizable per key.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use ipwarden::cache_adapter::{ActivityRecord, CacheAdapter, Counter};
use ipwarden::prelude::*;

#[derive(Debug, Clone)]
enum Value {
	Raw(Box<str>),
	Count(u64),
	Activity(ActivityRecord),
}

#[derive(Debug, Clone)]
struct Entry {
	value: Value,
	expires_at: Instant,
}

impl Entry {
	fn new(value: Value, ttl_secs: u32) -> Self {
		Self { value, expires_at: Instant::now() + Duration::from_secs(u64::from(ttl_secs)) }
	}

	fn is_expired(&self) -> bool {
		Instant::now() >= self.expires_at
	}

	/// Seconds until expiry, rounded up so callers never retry early.
	fn expires_in(&self) -> u32 {
		let remaining = self.expires_at.saturating_duration_since(Instant::now());
		let secs = remaining.as_secs();
		let secs = if remaining.subsec_nanos() > 0 { secs + 1 } else { secs };
		u32::try_from(secs).unwrap_or(u32::MAX)
	}
}

/// Expiring keyed store held in process memory.
#[derive(Debug, Default)]
pub struct CacheAdapterMemory {
	entries: Mutex<HashMap<Box<str>, Entry>>,
}

impl CacheAdapterMemory {
	pub fn new() -> Self {
		Self::default()
	}

	/// Live entry count, for tests and diagnostics.
	pub fn len(&self) -> usize {
		let entries = self.entries.lock();
		entries.values().filter(|e| !e.is_expired()).count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[async_trait]
impl CacheAdapter for CacheAdapterMemory {
	async fn get(&self, key: &str) -> IwResult<Option<Box<str>>> {
		let entries = self.entries.lock();
		let Some(entry) = entries.get(key) else { return Ok(None) };
		if entry.is_expired() {
			return Ok(None);
		}
		let raw = match &entry.value {
			Value::Raw(raw) => raw.clone(),
			Value::Count(count) => count.to_string().into(),
			Value::Activity(record) => serde_json::to_string(record)?.into(),
		};
		Ok(Some(raw))
	}

	async fn set(&self, key: &str, value: &str, ttl_secs: u32) -> IwResult<()> {
		let mut entries = self.entries.lock();
		entries.insert(key.into(), Entry::new(Value::Raw(value.into()), ttl_secs));
		Ok(())
	}

	async fn increment(&self, key: &str, ttl_secs: u32) -> IwResult<Counter> {
		let mut entries = self.entries.lock();
		match entries.get_mut(key) {
			Some(entry) if !entry.is_expired() => {
				let count = match &mut entry.value {
					Value::Count(count) => {
						*count += 1;
						*count
					}
					// Key reused for a different shape: start over.
					other => {
						*other = Value::Count(1);
						1
					}
				};
				Ok(Counter { count, expires_in: entry.expires_in() })
			}
			_ => {
				let entry = Entry::new(Value::Count(1), ttl_secs);
				let expires_in = entry.expires_in();
				entries.insert(key.into(), entry);
				Ok(Counter { count: 1, expires_in })
			}
		}
	}

	async fn record_visit(&self, key: &str, path: &str, ttl_secs: u32)
		-> IwResult<ActivityRecord> {
		let mut entries = self.entries.lock();
		match entries.get_mut(key) {
			Some(entry) if !entry.is_expired() => match &mut entry.value {
				Value::Activity(record) => {
					record.count += 1;
					record.merge_path(path);
					Ok(record.clone())
				}
				// Key reused for a different shape: start a fresh record
				// under the existing expiry.
				other => {
					let mut record = ActivityRecord { count: 1, paths: Vec::new() };
					record.merge_path(path);
					*other = Value::Activity(record.clone());
					Ok(record)
				}
			},
			_ => {
				let mut record = ActivityRecord { count: 1, paths: Vec::new() };
				record.merge_path(path);
				entries.insert(key.into(), Entry::new(Value::Activity(record.clone()), ttl_secs));
				Ok(record)
			}
		}
	}

	async fn keys_with_prefix(&self, prefix: &str) -> IwResult<Vec<Box<str>>> {
		let entries = self.entries.lock();
		let keys = entries
			.iter()
			.filter(|(key, entry)| key.starts_with(prefix) && !entry.is_expired())
			.map(|(key, _)| key.clone())
			.collect();
		Ok(keys)
	}

	async fn purge_expired(&self) -> IwResult<usize> {
		let mut entries = self.entries.lock();
		let before = entries.len();
		entries.retain(|_, entry| !entry.is_expired());
		Ok(before - entries.len())
	}
}


// vim: ts=4
