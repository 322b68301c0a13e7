//! Blocklist gate.
//!
//! First stage of the request pipeline after address resolution. The
//! durable blocklist is consulted through a small bounded verdict cache
//! so repeat traffic does not hit the store on every request; a cached
//! verdict expires after a short TTL, so unblocking converges within
//! that lag. False negatives during the lag are acceptable, false
//! positives are not: a "blocked" verdict is only ever cached from an
//! actual store match.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::prelude::*;
use ipwarden_types::log_adapter::LogAdapter;

const DEFAULT_VERDICT_TTL: Duration = Duration::from_secs(30);

// SAFETY: non-zero constant
const VERDICT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(4096) {
	Some(v) => v,
	None => unreachable!(),
};

struct Verdict {
	blocked: bool,
	expires_at: Instant,
}

/// Hot-path blocklist check over the durable store.
pub struct BlocklistGate {
	log_adapter: Arc<dyn LogAdapter>,
	verdicts: Mutex<LruCache<Box<str>, Verdict>>,
	verdict_ttl: Duration,
}

impl BlocklistGate {
	pub fn new(log_adapter: Arc<dyn LogAdapter>) -> Self {
		Self::with_ttl(log_adapter, DEFAULT_VERDICT_TTL)
	}

	pub fn with_ttl(log_adapter: Arc<dyn LogAdapter>, verdict_ttl: Duration) -> Self {
		Self {
			log_adapter,
			verdicts: Mutex::new(LruCache::new(VERDICT_CAPACITY)),
			verdict_ttl,
		}
	}

	/// Whether `ip` is currently blocked. Fails open: a store error is
	/// logged and the request is admitted.
	pub async fn check(&self, ip: &str) -> bool {
		if let Some(blocked) = self.cached(ip) {
			return blocked;
		}

		match self.log_adapter.is_blocked(ip).await {
			Ok(blocked) => {
				let verdict = Verdict { blocked, expires_at: Instant::now() + self.verdict_ttl };
				self.verdicts.lock().put(ip.into(), verdict);
				blocked
			}
			Err(err) => {
				error!("Blocklist check failed for {}: {}", ip, err);
				false
			}
		}
	}

	fn cached(&self, ip: &str) -> Option<bool> {
		let mut verdicts = self.verdicts.lock();
		match verdicts.get(ip) {
			Some(verdict) if verdict.expires_at > Instant::now() => Some(verdict.blocked),
			Some(_) => {
				verdicts.pop(ip);
				None
			}
			None => None,
		}
	}

	/// Drop the cached verdict for `ip`, so a block or unblock takes
	/// effect without waiting out the TTL.
	pub fn invalidate(&self, ip: &str) {
		self.verdicts.lock().pop(ip);
	}
}


// vim: ts=4
