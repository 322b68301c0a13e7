//! Standalone ipwarden server.
//!
//! Reads its configuration from `IPWARDEN_*` environment variables and
//! wires the bundled adapters: the in-memory cache, the SQLite log
//! store, and the HTTP geolocation provider (or a static stand-in when
//! no provider is configured).

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use ipwarden::geo_adapter::GeoAdapter;
use ipwarden::log_adapter::LogAdapter;
use ipwarden::prelude::*;
use ipwarden::rate_limit::RateQuota;
use ipwarden::scanner::ScanRules;
use ipwarden::AppBuilder;
use ipwarden_cache_adapter_memory::CacheAdapterMemory;
use ipwarden_geo_adapter_http::{GeoAdapterHttp, GeoAdapterStatic};
use ipwarden_log_adapter_sqlite::LogAdapterSqlite;

const GEO_TIMEOUT_MS: u64 = 5000;

// Config //
//********//

struct Config {
	listen: Option<Box<str>>,
	db_dir: PathBuf,
	trust_proxy: bool,
	geo_url: Option<Box<str>>,
	geo_api_key: Option<Box<str>>,
	rate_auth: Option<RateQuota>,
	rate_anon: Option<RateQuota>,
	scan_cron: Option<Box<str>>,
	request_threshold: Option<u64>,
	sensitive_paths: Option<Vec<Box<str>>>,
	blocklist: Vec<Box<str>>,
}

impl Config {
	fn from_env() -> IwResult<Self> {
		let rate_auth = env_opt("IPWARDEN_RATE_AUTH")
			.map(|raw| parse_quota("IPWARDEN_RATE_AUTH", &raw))
			.transpose()?;
		let rate_anon = env_opt("IPWARDEN_RATE_ANON")
			.map(|raw| parse_quota("IPWARDEN_RATE_ANON", &raw))
			.transpose()?;
		let request_threshold = env_opt("IPWARDEN_REQUEST_THRESHOLD")
			.map(|raw| {
				raw.parse::<u64>().map_err(|_| {
					Error::ConfigError(
						format!("IPWARDEN_REQUEST_THRESHOLD: expected a number, got '{}'", raw)
							.into(),
					)
				})
			})
			.transpose()?;

		Ok(Self {
			listen: env_opt("IPWARDEN_LISTEN").map(Into::into),
			db_dir: PathBuf::from(env_opt("IPWARDEN_DB_DIR").unwrap_or_else(|| "./data".into())),
			trust_proxy: env_opt("IPWARDEN_TRUST_PROXY").is_some_and(|raw| parse_bool(&raw)),
			geo_url: env_opt("IPWARDEN_GEO_URL").map(Into::into),
			geo_api_key: env_opt("IPWARDEN_GEO_API_KEY").map(Into::into),
			rate_auth,
			rate_anon,
			scan_cron: env_opt("IPWARDEN_SCAN_CRON").map(Into::into),
			request_threshold,
			sensitive_paths: env_opt("IPWARDEN_SENSITIVE_PATHS").map(|raw| split_list(&raw)),
			blocklist: env_opt("IPWARDEN_BLOCKLIST").map(|raw| split_list(&raw)).unwrap_or_default(),
		})
	}
}

/// Set and non-empty only; an empty variable counts as unset.
fn env_opt(name: &str) -> Option<String> {
	env::var(name).ok().filter(|value| !value.is_empty())
}

fn parse_bool(raw: &str) -> bool {
	matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn split_list(raw: &str) -> Vec<Box<str>> {
	raw.split(',').map(str::trim).filter(|item| !item.is_empty()).map(Into::into).collect()
}

/// Quotas are written as `max_requests/window_secs`, e.g. `10/60`.
fn parse_quota(name: &str, raw: &str) -> IwResult<RateQuota> {
	let Some((max, window)) = raw.split_once('/') else {
		return Err(Error::ConfigError(
			format!("{}: expected max_requests/window_secs, got '{}'", name, raw).into(),
		));
	};
	let max = max.trim().parse::<u64>().map_err(|_| {
		Error::ConfigError(format!("{}: max_requests is not a number: '{}'", name, max).into())
	})?;
	let window = window.trim().parse::<u32>().map_err(|_| {
		Error::ConfigError(format!("{}: window_secs is not a number: '{}'", name, window).into())
	})?;
	if max == 0 || window == 0 {
		return Err(Error::ConfigError(format!("{}: quota must be positive", name).into()));
	}
	Ok(RateQuota::new(max, window))
}

// Startup //
//*********//

async fn run() -> IwResult<()> {
	let config = Config::from_env()?;

	let cache_adapter = Arc::new(CacheAdapterMemory::new());
	let log_adapter = Arc::new(LogAdapterSqlite::new(config.db_dir.join("ipwarden.db")).await?);
	let geo_adapter: Arc<dyn GeoAdapter> = match &config.geo_url {
		Some(url) => {
			Arc::new(GeoAdapterHttp::new(url, config.geo_api_key.as_deref(), GEO_TIMEOUT_MS)?)
		}
		None => {
			warn!("IPWARDEN_GEO_URL is not set, geolocation stays unknown");
			Arc::new(GeoAdapterStatic::unknown())
		}
	};

	if !config.blocklist.is_empty() {
		for ip in &config.blocklist {
			log_adapter.block(ip, Some("configured at startup")).await?;
		}
		info!("Seeded blocklist with {} addresses", config.blocklist.len());
	}

	let mut scan_rules = ScanRules::default();
	if let Some(threshold) = config.request_threshold {
		scan_rules.request_threshold = threshold;
	}
	if let Some(paths) = config.sensitive_paths {
		scan_rules.sensitive_paths = paths;
	}

	let mut builder = AppBuilder::new();
	builder
		.trust_proxy(config.trust_proxy)
		.scan_rules(scan_rules)
		.cache_adapter(cache_adapter)
		.log_adapter(log_adapter)
		.geo_adapter(geo_adapter);
	if let Some(listen) = config.listen {
		builder.listen(listen);
	}
	if let Some(scan_cron) = config.scan_cron {
		builder.scan_cron(scan_cron);
	}
	if let Some(quota) = config.rate_auth {
		builder.auth_quota(quota);
	}
	if let Some(quota) = config.rate_anon {
		builder.anon_quota(quota);
	}

	let app = builder.build()?;
	ipwarden::app::run(app).await
}

#[tokio::main]
async fn main() -> ExitCode {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
		)
		.with_target(false)
		.init();

	match run().await {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			error!("FATAL: {}", err);
			ExitCode::FAILURE
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn quota_format_parses() {
		let quota = parse_quota("IPWARDEN_RATE_AUTH", "10/60").unwrap();
		assert_eq!(quota, RateQuota::new(10, 60));

		assert!(parse_quota("IPWARDEN_RATE_AUTH", "10").is_err());
		assert!(parse_quota("IPWARDEN_RATE_AUTH", "ten/60").is_err());
		assert!(parse_quota("IPWARDEN_RATE_AUTH", "0/60").is_err());
		assert!(parse_quota("IPWARDEN_RATE_AUTH", "10/0").is_err());
	}

	#[test]
	fn list_variables_split_on_commas() {
		assert_eq!(split_list("/admin, /login ,,/api/internal"), vec![
			Box::from("/admin"),
			Box::from("/login"),
			Box::from("/api/internal"),
		]);
	}

	#[test]
	fn truthy_values_enable_proxy_trust() {
		assert!(parse_bool("1"));
		assert!(parse_bool("True"));
		assert!(parse_bool("yes"));
		assert!(!parse_bool("0"));
		assert!(!parse_bool("no"));
	}
}

// vim: ts=4
