//! App state type

use std::sync::Arc;

use crate::block::BlocklistGate;
use crate::prelude::*;
use crate::rate_limit::{DEFAULT_ANON_QUOTA, DEFAULT_AUTH_QUOTA, RateLimiter, RateQuota};
use crate::scanner::{ScanRules, Scanner};
use crate::scheduler::Scheduler;

use ipwarden_types::cache_adapter::CacheAdapter;
use ipwarden_types::geo_adapter::GeoAdapter;
use ipwarden_types::log_adapter::LogAdapter;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct AppState {
	pub scheduler: Arc<Scheduler<App>>,
	pub gate: BlocklistGate,
	pub limiter: RateLimiter,
	pub scanner: Scanner,
	pub opts: AppOpts,

	pub cache_adapter: Arc<dyn CacheAdapter>,
	pub log_adapter: Arc<dyn LogAdapter>,
	pub geo_adapter: Arc<dyn GeoAdapter>,
}

pub type App = Arc<AppState>;

pub struct Adapters {
	pub cache_adapter: Option<Arc<dyn CacheAdapter>>,
	pub log_adapter: Option<Arc<dyn LogAdapter>>,
	pub geo_adapter: Option<Arc<dyn GeoAdapter>>,
}

#[derive(Debug)]
pub struct AppOpts {
	pub listen: Box<str>,
	pub trust_proxy: bool,
	pub scan_cron: Box<str>,
}

pub struct AppBuilder {
	opts: AppOpts,
	auth_quota: RateQuota,
	anon_quota: RateQuota,
	scan_rules: ScanRules,
	adapters: Adapters,
}

impl AppBuilder {
	pub fn new() -> Self {
		AppBuilder {
			opts: AppOpts {
				listen: "127.0.0.1:8080".into(),
				trust_proxy: false,
				scan_cron: "0 * * * *".into(),
			},
			auth_quota: DEFAULT_AUTH_QUOTA,
			anon_quota: DEFAULT_ANON_QUOTA,
			scan_rules: ScanRules::default(),
			adapters: Adapters { cache_adapter: None, log_adapter: None, geo_adapter: None },
		}
	}

	// Opts
	pub fn listen(&mut self, listen: impl Into<Box<str>>) -> &mut Self { self.opts.listen = listen.into(); self }
	pub fn trust_proxy(&mut self, trust_proxy: bool) -> &mut Self { self.opts.trust_proxy = trust_proxy; self }
	pub fn scan_cron(&mut self, scan_cron: impl Into<Box<str>>) -> &mut Self { self.opts.scan_cron = scan_cron.into(); self }
	pub fn auth_quota(&mut self, quota: RateQuota) -> &mut Self { self.auth_quota = quota; self }
	pub fn anon_quota(&mut self, quota: RateQuota) -> &mut Self { self.anon_quota = quota; self }
	pub fn scan_rules(&mut self, rules: ScanRules) -> &mut Self { self.scan_rules = rules; self }

	// Adapters
	pub fn cache_adapter(&mut self, cache_adapter: Arc<dyn CacheAdapter>) -> &mut Self { self.adapters.cache_adapter = Some(cache_adapter); self }
	pub fn log_adapter(&mut self, log_adapter: Arc<dyn LogAdapter>) -> &mut Self { self.adapters.log_adapter = Some(log_adapter); self }
	pub fn geo_adapter(&mut self, geo_adapter: Arc<dyn GeoAdapter>) -> &mut Self { self.adapters.geo_adapter = Some(geo_adapter); self }

	/// Assemble the shared state. Fails when a required adapter is
	/// missing; the scheduler is created but not started.
	pub fn build(self) -> IwResult<App> {
		let Some(cache_adapter) = self.adapters.cache_adapter else {
			error!("FATAL: No cache adapter configured");
			return Err(Error::ConfigError("no cache adapter configured".into()));
		};
		let Some(log_adapter) = self.adapters.log_adapter else {
			error!("FATAL: No log adapter configured");
			return Err(Error::ConfigError("no log adapter configured".into()));
		};
		let Some(geo_adapter) = self.adapters.geo_adapter else {
			error!("FATAL: No geo adapter configured");
			return Err(Error::ConfigError("no geo adapter configured".into()));
		};

		Ok(Arc::new(AppState {
			scheduler: Scheduler::new(),
			gate: BlocklistGate::new(log_adapter.clone()),
			limiter: RateLimiter::with_quotas(
				cache_adapter.clone(),
				self.auth_quota,
				self.anon_quota,
			),
			scanner: Scanner::with_rules(
				cache_adapter.clone(),
				log_adapter.clone(),
				self.scan_rules,
			),
			opts: self.opts,

			cache_adapter,
			log_adapter,
			geo_adapter,
		}))
	}
}

impl Default for AppBuilder {
	fn default() -> Self { Self::new() }
}


// vim: ts=4
