//! Scheduled maintenance jobs.

use async_trait::async_trait;

use crate::prelude::*;
use crate::scheduler::Task;

/// Runs the suspicious-activity scanner and reports its summary.
#[derive(Debug)]
pub struct ScanTask;

#[async_trait]
impl Task<App> for ScanTask {
	fn kind_of(&self) -> &'static str {
		"scan"
	}

	async fn run(&self, state: &App) -> IwResult<()> {
		let summary = state.scanner.scan().await?;
		info!("{}", summary);
		Ok(())
	}
}

/// Evicts expired entries from the shared store, for adapters that
/// otherwise expire lazily on access.
#[derive(Debug)]
pub struct PurgeCacheTask;

#[async_trait]
impl Task<App> for PurgeCacheTask {
	fn kind_of(&self) -> &'static str {
		"purge_cache"
	}

	async fn run(&self, state: &App) -> IwResult<()> {
		let purged = state.cache_adapter.purge_expired().await?;
		if purged > 0 {
			debug!("Purged {} expired cache entries", purged);
		}
		Ok(())
	}
}

// vim: ts=4
