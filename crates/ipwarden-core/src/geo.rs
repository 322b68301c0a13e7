//! Geolocation enrichment with a TTL cache.
//!
//! Resolved locations live in the shared store under `geo:{ip}` for a
//! day, so the provider sees each address at most once per TTL. Every
//! failure path degrades to [`GeoRecord::unknown`]; failures are never
//! cached, so the next request for the same address retries the
//! provider.

use std::sync::Arc;

use crate::prelude::*;
use ipwarden_types::cache_adapter::CacheAdapter;
use ipwarden_types::geo_adapter::{GeoAdapter, GeoRecord};

/// Cache lifetime of a resolved location, in seconds.
pub const GEO_TTL: u32 = 86_400;

/// Key prefix of the geolocation family in the shared store.
pub const GEO_PREFIX: &str = "geo:";

pub fn geo_key(ip: &str) -> String {
	format!("{}{}", GEO_PREFIX, ip)
}

/// Resolve the location of `ip`, cache first, provider second. Never
/// fails: cache trouble falls through to the provider, provider trouble
/// degrades to unknown.
pub async fn resolve(
	cache: &Arc<dyn CacheAdapter>,
	geo: &Arc<dyn GeoAdapter>,
	ip: &str,
) -> GeoRecord {
	let key = geo_key(ip);

	match cache.get(&key).await {
		Ok(Some(raw)) => match serde_json::from_str::<GeoRecord>(&raw) {
			Ok(record) => return record,
			Err(err) => warn!("Dropping malformed geo record {}: {}", key, err),
		},
		Ok(None) => (),
		Err(err) => error!("Geo cache read failed for {}: {}", ip, err),
	}

	let record = match geo.lookup(ip).await {
		Ok(record) => record,
		Err(err) => {
			error!("Geo lookup failed for {}: {}", ip, err);
			return GeoRecord::unknown();
		}
	};

	match serde_json::to_string(&record) {
		Ok(json) => {
			if let Err(err) = cache.set(&key, &json, GEO_TTL).await {
				error!("Geo cache write failed for {}: {}", ip, err);
			}
		}
		Err(err) => error!("Geo record for {} did not serialize: {}", ip, err),
	}

	record
}

#[cfg(test)]
mod tests {
	use super::*;
	use ipwarden_cache_adapter_memory::CacheAdapterMemory;
	use ipwarden_types::error::Error;
	use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

	#[derive(Debug)]
	struct ScriptedGeo {
		record: GeoRecord,
		fail: AtomicBool,
		lookups: AtomicU32,
	}

	impl ScriptedGeo {
		fn answering(country: &str, city: &str) -> Self {
			Self {
				record: GeoRecord { country: Some(country.into()), city: Some(city.into()) },
				fail: AtomicBool::new(false),
				lookups: AtomicU32::new(0),
			}
		}

		fn failing() -> Self {
			Self {
				record: GeoRecord::unknown(),
				fail: AtomicBool::new(true),
				lookups: AtomicU32::new(0),
			}
		}

		fn lookups(&self) -> u32 {
			self.lookups.load(Ordering::SeqCst)
		}
	}

	#[async_trait::async_trait]
	impl GeoAdapter for ScriptedGeo {
		async fn lookup(&self, _ip: &str) -> IwResult<GeoRecord> {
			self.lookups.fetch_add(1, Ordering::SeqCst);
			if self.fail.load(Ordering::SeqCst) {
				Err(Error::GeoError("provider down".into()))
			} else {
				Ok(self.record.clone())
			}
		}
	}

	#[tokio::test]
	async fn second_resolve_is_served_from_cache() {
		let cache: Arc<dyn CacheAdapter> = Arc::new(CacheAdapterMemory::new());
		let provider = Arc::new(ScriptedGeo::answering("HU", "Budapest"));
		let geo: Arc<dyn GeoAdapter> = provider.clone();

		let first = resolve(&cache, &geo, "10.0.0.5").await;
		let second = resolve(&cache, &geo, "10.0.0.5").await;

		assert_eq!(first.country.as_deref(), Some("HU"));
		assert_eq!(second.city.as_deref(), Some("Budapest"));
		assert_eq!(provider.lookups(), 1);
	}

	#[tokio::test]
	async fn distinct_addresses_each_hit_the_provider() {
		let cache: Arc<dyn CacheAdapter> = Arc::new(CacheAdapterMemory::new());
		let provider = Arc::new(ScriptedGeo::answering("DE", "Berlin"));
		let geo: Arc<dyn GeoAdapter> = provider.clone();

		resolve(&cache, &geo, "10.0.0.5").await;
		resolve(&cache, &geo, "10.0.0.6").await;

		assert_eq!(provider.lookups(), 2);
	}

	#[tokio::test]
	async fn provider_failure_degrades_to_unknown_and_is_not_cached() {
		let cache: Arc<dyn CacheAdapter> = Arc::new(CacheAdapterMemory::new());
		let provider = Arc::new(ScriptedGeo::failing());
		let geo: Arc<dyn GeoAdapter> = provider.clone();

		let first = resolve(&cache, &geo, "10.0.0.5").await;
		assert_eq!(first, GeoRecord::unknown());
		assert!(cache.get("geo:10.0.0.5").await.unwrap().is_none());

		// Recovery: the next resolve retries instead of serving a cached failure.
		provider.fail.store(false, Ordering::SeqCst);
		let second = resolve(&cache, &geo, "10.0.0.5").await;
		assert_eq!(second, GeoRecord::unknown());
		assert_eq!(provider.lookups(), 2);
	}

	#[tokio::test]
	async fn malformed_cache_entry_falls_through_to_provider() {
		let cache: Arc<dyn CacheAdapter> = Arc::new(CacheAdapterMemory::new());
		cache.set("geo:10.0.0.5", "not json", 60).await.unwrap();
		let provider = Arc::new(ScriptedGeo::answering("FR", "Paris"));
		let geo: Arc<dyn GeoAdapter> = provider.clone();

		let record = resolve(&cache, &geo, "10.0.0.5").await;

		assert_eq!(record.country.as_deref(), Some("FR"));
		assert_eq!(provider.lookups(), 1);
	}
}

// vim: ts=4
