//! Scanner behavior over live traffic: detections feed the durable
//! findings store, rescans stay idempotent, and the maintenance tasks
//! run through the scheduler.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tower::ServiceExt;

use common::{env, env_with, get};
use ipwarden::cache_adapter::CacheAdapter;
use ipwarden::log_adapter::LogAdapter;
use ipwarden::maintenance::{PurgeCacheTask, ScanTask};
use ipwarden::scanner::ScanRules;

#[tokio::test]
async fn scan_flags_volume_and_sensitive_paths_end_to_end() {
	let env = env().await;

	for _ in 0..101 {
		env.router.clone().oneshot(get("/home", "10.0.0.5")).await.unwrap();
	}
	env.router.clone().oneshot(get("/admin/users", "10.0.0.6")).await.unwrap();
	env.router.clone().oneshot(get("/about", "10.0.0.7")).await.unwrap();

	let summary = env.app.scanner.scan().await.unwrap();
	assert_eq!(summary.ips_checked, 3);
	assert_eq!(summary.flagged, 2);
	assert!(summary.to_string().starts_with("Checked 3 IPs, flagged 2 suspicious at "));

	let volume = env.log.list_suspicious(Some("10.0.0.5")).await.unwrap();
	assert_eq!(volume.len(), 1);
	assert_eq!(volume[0].reason.as_ref(), "Excessive requests: 101 in last hour");

	let sensitive = env.log.list_suspicious(Some("10.0.0.6")).await.unwrap();
	assert_eq!(sensitive.len(), 1);
	assert_eq!(sensitive[0].reason.as_ref(), "Accessed sensitive path: /admin/users");

	assert!(env.log.list_suspicious(Some("10.0.0.7")).await.unwrap().is_empty());
}

#[tokio::test]
async fn rescan_counts_detections_without_duplicating_rows() {
	let env = env_with(|builder| {
		builder.scan_rules(ScanRules { request_threshold: 2, sensitive_paths: vec![] });
	})
	.await;

	for _ in 0..3 {
		env.router.clone().oneshot(get("/home", "10.0.0.5")).await.unwrap();
	}

	let first = env.app.scanner.scan().await.unwrap();
	assert_eq!(first.flagged, 1);

	let second = env.app.scanner.scan().await.unwrap();
	assert_eq!(second.flagged, 1);
	assert_eq!(env.log.list_suspicious(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn custom_rules_watch_their_own_paths() {
	let env = env_with(|builder| {
		builder.scan_rules(ScanRules {
			request_threshold: 1000,
			sensitive_paths: vec!["/secret".into()],
		});
	})
	.await;

	env.router.clone().oneshot(get("/secret/docs", "10.0.0.5")).await.unwrap();
	env.router.clone().oneshot(get("/admin/users", "10.0.0.6")).await.unwrap();

	env.app.scanner.scan().await.unwrap();

	let flagged = env.log.list_suspicious(None).await.unwrap();
	assert_eq!(flagged.len(), 1);
	assert_eq!(flagged[0].ip_address.as_ref(), "10.0.0.5");
	assert_eq!(flagged[0].reason.as_ref(), "Accessed sensitive path: /secret/docs");
}

#[tokio::test]
async fn ipv6_addresses_round_trip_the_scan() {
	let env = env().await;

	env.router.clone().oneshot(get("/admin/panel", "2001:db8::7")).await.unwrap();

	let summary = env.app.scanner.scan().await.unwrap();
	assert_eq!(summary.ips_checked, 1);

	let flagged = env.log.list_suspicious(Some("2001:db8::7")).await.unwrap();
	assert_eq!(flagged.len(), 1);
	assert_eq!(flagged[0].reason.as_ref(), "Accessed sensitive path: /admin/panel");
}

#[tokio::test]
async fn empty_activity_scans_clean() {
	let env = env().await;

	let summary = env.app.scanner.scan().await.unwrap();
	assert_eq!(summary.ips_checked, 0);
	assert_eq!(summary.flagged, 0);
	assert!(summary.to_string().starts_with("Checked 0 IPs, flagged 0 suspicious at "));
}

#[tokio::test]
async fn scheduled_scan_runs_through_the_scheduler() {
	let _ = tracing_subscriber::fmt().try_init();

	let env = env_with(|builder| {
		builder.scan_rules(ScanRules { request_threshold: 2, sensitive_paths: vec![] });
	})
	.await;

	for _ in 0..3 {
		env.router.clone().oneshot(get("/home", "10.0.0.5")).await.unwrap();
	}

	env.app.scheduler.start(env.app.clone());
	env.app.scheduler.add(Arc::new(ScanTask));
	tokio::time::sleep(Duration::from_millis(500)).await;

	let flagged = env.log.list_suspicious(Some("10.0.0.5")).await.unwrap();
	assert_eq!(flagged.len(), 1);
	assert_eq!(flagged[0].reason.as_ref(), "Excessive requests: 3 in last hour");
}

#[tokio::test]
async fn scheduled_purge_reclaims_expired_entries() {
	let _ = tracing_subscriber::fmt().try_init();

	let env = env().await;
	env.app.cache_adapter.set("geo:10.0.0.5", "{}", 1).await.unwrap();
	tokio::time::sleep(Duration::from_millis(1100)).await;

	env.app.scheduler.start(env.app.clone());
	env.app.scheduler.add(Arc::new(PurgeCacheTask));
	tokio::time::sleep(Duration::from_millis(400)).await;

	// The scheduled pass already reclaimed the entry
	assert_eq!(env.app.cache_adapter.purge_expired().await.unwrap(), 0);
}

// vim: ts=4
