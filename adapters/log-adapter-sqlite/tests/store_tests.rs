//! Durable store behavior tests: audit trail append/list, blocklist
//! existence semantics, and create-if-absent scanner findings.

use ipwarden::log_adapter::{LogAdapter, RequestLogEntry};
use ipwarden::types::Timestamp;
use ipwarden_log_adapter_sqlite::LogAdapterSqlite;
use tempfile::TempDir;

async fn create_test_adapter() -> (LogAdapterSqlite, TempDir) {
	let temp_dir = TempDir::new().expect("Failed to create temp directory");
	let adapter = LogAdapterSqlite::new(temp_dir.path().join("requests.db"))
		.await
		.expect("Failed to create adapter");
	(adapter, temp_dir)
}

fn entry(ip: &str, path: &str, country: Option<&str>) -> RequestLogEntry {
	RequestLogEntry {
		ip_address: ip.into(),
		timestamp: Timestamp::now(),
		path: path.into(),
		country: country.map(Into::into),
		city: None,
	}
}

#[tokio::test]
async fn append_and_list_requests() {
	let (adapter, _temp) = create_test_adapter().await;

	adapter.append_request(&entry("127.0.0.1", "/home", Some("HU"))).await.expect("append");
	adapter.append_request(&entry("10.0.0.5", "/login", None)).await.expect("append");

	let entries = adapter.list_requests(10).await.expect("list");
	assert_eq!(entries.len(), 2);
	// Newest first
	assert_eq!(entries[0].ip_address.as_ref(), "10.0.0.5");
	assert_eq!(entries[0].country, None);
	assert_eq!(entries[1].path.as_ref(), "/home");
	assert_eq!(entries[1].country.as_deref(), Some("HU"));
}

#[tokio::test]
async fn list_requests_respects_limit() {
	let (adapter, _temp) = create_test_adapter().await;

	for i in 0..5 {
		let path = format!("/page/{}", i);
		adapter.append_request(&entry("127.0.0.1", &path, None)).await.expect("append");
	}

	let entries = adapter.list_requests(3).await.expect("list");
	assert_eq!(entries.len(), 3);
	assert_eq!(entries[0].path.as_ref(), "/page/4");
}

#[tokio::test]
async fn blocklist_existence_check() {
	let (adapter, _temp) = create_test_adapter().await;

	assert!(!adapter.is_blocked("192.168.1.1").await.expect("check"));

	adapter.block("192.168.1.1", Some("abuse report")).await.expect("block");
	assert!(adapter.is_blocked("192.168.1.1").await.expect("check"));
	assert!(!adapter.is_blocked("192.168.1.2").await.expect("check"));

	let blocked = adapter.list_blocked().await.expect("list");
	assert_eq!(blocked.len(), 1);
	assert_eq!(blocked[0].reason.as_deref(), Some("abuse report"));
}

#[tokio::test]
async fn blocking_twice_keeps_original_entry() {
	let (adapter, _temp) = create_test_adapter().await;

	adapter.block("192.168.1.1", Some("first")).await.expect("block");
	adapter.block("192.168.1.1", Some("second")).await.expect("block");

	let blocked = adapter.list_blocked().await.expect("list");
	assert_eq!(blocked.len(), 1);
	assert_eq!(blocked[0].reason.as_deref(), Some("first"));
}

#[tokio::test]
async fn unblock_removes_entry() {
	let (adapter, _temp) = create_test_adapter().await;

	adapter.block("192.168.1.1", None).await.expect("block");
	adapter.unblock("192.168.1.1").await.expect("unblock");
	assert!(!adapter.is_blocked("192.168.1.1").await.expect("check"));
}

#[tokio::test]
async fn flag_suspicious_is_create_if_absent() {
	let (adapter, _temp) = create_test_adapter().await;
	let now = Timestamp::now();

	let created = adapter
		.flag_suspicious("10.0.0.5", "Excessive requests: 101 in last hour", now)
		.await
		.expect("flag");
	assert!(created);

	let repeat = adapter
		.flag_suspicious("10.0.0.5", "Excessive requests: 101 in last hour", now.add_seconds(60))
		.await
		.expect("flag");
	assert!(!repeat);

	let found = adapter.list_suspicious(Some("10.0.0.5")).await.expect("list");
	assert_eq!(found.len(), 1);
	assert_eq!(found[0].flagged_at, now);
}

#[tokio::test]
async fn same_ip_can_carry_multiple_reasons() {
	let (adapter, _temp) = create_test_adapter().await;
	let now = Timestamp::now();

	adapter.flag_suspicious("10.0.0.6", "Accessed sensitive path: /admin/x", now).await.expect("flag");
	adapter.flag_suspicious("10.0.0.6", "Accessed sensitive path: /login", now).await.expect("flag");
	adapter.flag_suspicious("10.0.0.7", "Accessed sensitive path: /login", now).await.expect("flag");

	let for_ip = adapter.list_suspicious(Some("10.0.0.6")).await.expect("list");
	assert_eq!(for_ip.len(), 2);

	let all = adapter.list_suspicious(None).await.expect("list");
	assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn reopening_database_is_idempotent() {
	let temp_dir = TempDir::new().expect("Failed to create temp directory");
	let path = temp_dir.path().join("requests.db");

	{
		let adapter = LogAdapterSqlite::new(&path).await.expect("create");
		adapter.block("1.2.3.4", None).await.expect("block");
	}

	let adapter = LogAdapterSqlite::new(&path).await.expect("reopen");
	assert!(adapter.is_blocked("1.2.3.4").await.expect("check"));
}
