//! Suspicious-activity scanner.
//!
//! Walks a snapshot of the live activity windows and applies two rules:
//! a volume rule (more requests in the window than the threshold) and a
//! sensitive-path rule (any recorded path under a watched prefix).
//! Findings are persisted create-if-absent, so rescanning the same
//! window never duplicates rows. Runs hourly on the scheduler and on
//! demand.

use std::sync::Arc;

use crate::activity;
use crate::prelude::*;
use ipwarden_types::cache_adapter::{ActivityRecord, CacheAdapter};
use ipwarden_types::log_adapter::LogAdapter;

/// Requests per window above which an address is flagged.
pub const DEFAULT_REQUEST_THRESHOLD: u64 = 100;

/// Path prefixes watched by the sensitive-path rule.
pub const DEFAULT_SENSITIVE_PATHS: [&str; 2] = ["/admin", "/login"];

// ScanRules //
//***********//

/// Tunable knobs of the scanner rules.
#[derive(Debug, Clone)]
pub struct ScanRules {
	pub request_threshold: u64,
	pub sensitive_paths: Vec<Box<str>>,
}

impl Default for ScanRules {
	fn default() -> Self {
		Self {
			request_threshold: DEFAULT_REQUEST_THRESHOLD,
			sensitive_paths: DEFAULT_SENSITIVE_PATHS.iter().map(|p| (*p).into()).collect(),
		}
	}
}

impl ScanRules {
	/// Reasons `record` trips, in rule order. The volume rule yields at
	/// most one reason; the path rule yields one per recorded path under
	/// a watched prefix.
	pub fn reasons_for(&self, record: &ActivityRecord) -> Vec<String> {
		let mut reasons = Vec::new();

		if record.count > self.request_threshold {
			reasons.push(format!("Excessive requests: {} in last hour", record.count));
		}

		for path in &record.paths {
			if self.sensitive_paths.iter().any(|prefix| path.starts_with(prefix.as_ref())) {
				reasons.push(format!("Accessed sensitive path: {}", path));
			}
		}

		reasons
	}
}

// ScanSummary //
//*************//

/// Outcome of one scanner pass. `flagged` counts reasons detected in
/// this pass; a reason that already has a persisted row still counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
	pub ips_checked: usize,
	pub flagged: u64,
	pub finished_at: Timestamp,
}

impl std::fmt::Display for ScanSummary {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"Checked {} IPs, flagged {} suspicious at {}",
			self.ips_checked, self.flagged, self.finished_at
		)
	}
}

// Scanner //
//*********//

#[derive(Debug)]
pub struct Scanner {
	cache: Arc<dyn CacheAdapter>,
	log: Arc<dyn LogAdapter>,
	rules: ScanRules,
}

impl Scanner {
	pub fn new(cache: Arc<dyn CacheAdapter>, log: Arc<dyn LogAdapter>) -> Self {
		Self::with_rules(cache, log, ScanRules::default())
	}

	pub fn with_rules(
		cache: Arc<dyn CacheAdapter>,
		log: Arc<dyn LogAdapter>,
		rules: ScanRules,
	) -> Self {
		Self { cache, log, rules }
	}

	/// One pass over the current activity snapshot. Snapshot degradation
	/// (expired or unreadable records) shrinks the pass; a failing
	/// findings store aborts it so the scheduler retry can rerun the
	/// whole pass.
	pub async fn scan(&self) -> IwResult<ScanSummary> {
		let records = activity::snapshot_all(&self.cache).await?;
		let now = Timestamp::now();
		let mut flagged = 0u64;

		for (ip, record) in &records {
			for reason in self.rules.reasons_for(record) {
				if self.log.flag_suspicious(ip, &reason, now).await? {
					info!("Flagged {}: {}", ip, reason);
				} else {
					debug!("Already flagged {}: {}", ip, reason);
				}
				flagged += 1;
			}
		}

		Ok(ScanSummary { ips_checked: records.len(), flagged, finished_at: Timestamp::now() })
	}
}


// vim: ts=4
