//! SQLite-backed durable store for the governance layer: the request
//! audit trail, the operator blocklist, and scanner findings.

mod schema;

use async_trait::async_trait;
use sqlx::{
	Row,
	sqlite::{self, SqlitePool, SqliteRow},
};
use std::path::Path;

use ipwarden::log_adapter::{BlockedEntry, LogAdapter, RequestLogEntry, SuspiciousEntry};
use ipwarden::prelude::*;

use crate::schema::init_db;

// Helper functions
//******************

fn inspect(err: &sqlx::Error) {
	warn!("DB: {:#?}", err);
}

fn db_err(err: sqlx::Error) -> Error {
	inspect(&err);
	Error::DbError(err.to_string().into())
}

fn collect_rows<T, F>(rows: Vec<SqliteRow>, f: F) -> IwResult<Vec<T>>
where
	F: Fn(&SqliteRow) -> Result<T, sqlx::Error>,
{
	let mut items = Vec::with_capacity(rows.len());
	for row in &rows {
		items.push(f(row).map_err(db_err)?);
	}
	Ok(items)
}

fn request_from_row(row: &SqliteRow) -> Result<RequestLogEntry, sqlx::Error> {
	Ok(RequestLogEntry {
		ip_address: row.try_get("ip_address")?,
		timestamp: Timestamp(row.try_get::<i64, _>("timestamp")?),
		path: row.try_get("path")?,
		country: row.try_get("country")?,
		city: row.try_get("city")?,
	})
}

fn blocked_from_row(row: &SqliteRow) -> Result<BlockedEntry, sqlx::Error> {
	Ok(BlockedEntry {
		ip_address: row.try_get("ip_address")?,
		reason: row.try_get("reason")?,
		created_at: Timestamp(row.try_get::<i64, _>("created_at")?),
	})
}

fn suspicious_from_row(row: &SqliteRow) -> Result<SuspiciousEntry, sqlx::Error> {
	Ok(SuspiciousEntry {
		ip_address: row.try_get("ip_address")?,
		reason: row.try_get("reason")?,
		flagged_at: Timestamp(row.try_get::<i64, _>("flagged_at")?),
	})
}

#[derive(Debug)]
pub struct LogAdapterSqlite {
	db: SqlitePool,
}

impl LogAdapterSqlite {
	pub async fn new(path: impl AsRef<Path>) -> IwResult<Self> {
		if let Some(parent) = path.as_ref().parent() {
			if !parent.as_os_str().is_empty() {
				tokio::fs::create_dir_all(parent).await?;
			}
		}

		let opts = sqlite::SqliteConnectOptions::new()
			.filename(path.as_ref())
			.create_if_missing(true)
			.journal_mode(sqlite::SqliteJournalMode::Wal);
		let db = sqlite::SqlitePoolOptions::new()
			.max_connections(5)
			.connect_with(opts)
			.await
			.map_err(db_err)?;

		init_db(&db).await.map_err(db_err)?;

		Ok(Self { db })
	}
}

#[async_trait]
impl LogAdapter for LogAdapterSqlite {
	// Request audit trail
	//*********************
	async fn append_request(&self, entry: &RequestLogEntry) -> IwResult<()> {
		sqlx::query(
			"INSERT INTO request_log (ip_address, timestamp, path, country, city)
			VALUES (?1, ?2, ?3, ?4, ?5)",
		)
		.bind(entry.ip_address.as_ref())
		.bind(entry.timestamp.0)
		.bind(entry.path.as_ref())
		.bind(entry.country.as_deref())
		.bind(entry.city.as_deref())
		.execute(&self.db)
		.await
		.map_err(db_err)?;
		Ok(())
	}

	async fn list_requests(&self, limit: u32) -> IwResult<Vec<RequestLogEntry>> {
		let rows = sqlx::query(
			"SELECT ip_address, timestamp, path, country, city FROM request_log
			ORDER BY log_id DESC LIMIT ?1",
		)
		.bind(i64::from(limit))
		.fetch_all(&self.db)
		.await
		.map_err(db_err)?;
		collect_rows(rows, request_from_row)
	}

	// Operator blocklist
	//********************
	async fn is_blocked(&self, ip: &str) -> IwResult<bool> {
		let row = sqlx::query("SELECT 1 FROM blocked_ip WHERE ip_address = ?1")
			.bind(ip)
			.fetch_optional(&self.db)
			.await
			.map_err(db_err)?;
		Ok(row.is_some())
	}

	async fn block(&self, ip: &str, reason: Option<&str>) -> IwResult<()> {
		sqlx::query(
			"INSERT OR IGNORE INTO blocked_ip (ip_address, reason, created_at)
			VALUES (?1, ?2, ?3)",
		)
		.bind(ip)
		.bind(reason)
		.bind(Timestamp::now().0)
		.execute(&self.db)
		.await
		.map_err(db_err)?;
		Ok(())
	}

	async fn unblock(&self, ip: &str) -> IwResult<()> {
		sqlx::query("DELETE FROM blocked_ip WHERE ip_address = ?1")
			.bind(ip)
			.execute(&self.db)
			.await
			.map_err(db_err)?;
		Ok(())
	}

	async fn list_blocked(&self) -> IwResult<Vec<BlockedEntry>> {
		let rows = sqlx::query(
			"SELECT ip_address, reason, created_at FROM blocked_ip ORDER BY created_at",
		)
		.fetch_all(&self.db)
		.await
		.map_err(db_err)?;
		collect_rows(rows, blocked_from_row)
	}

	// Scanner findings
	//******************
	async fn flag_suspicious(&self, ip: &str, reason: &str, flagged_at: Timestamp)
		-> IwResult<bool> {
		let res = sqlx::query(
			"INSERT OR IGNORE INTO suspicious_ip (ip_address, reason, flagged_at)
			VALUES (?1, ?2, ?3)",
		)
		.bind(ip)
		.bind(reason)
		.bind(flagged_at.0)
		.execute(&self.db)
		.await
		.map_err(db_err)?;
		Ok(res.rows_affected() > 0)
	}

	async fn list_suspicious(&self, ip: Option<&str>) -> IwResult<Vec<SuspiciousEntry>> {
		let rows = match ip {
			Some(ip) => {
				sqlx::query(
					"SELECT ip_address, reason, flagged_at FROM suspicious_ip
					WHERE ip_address = ?1 ORDER BY flagged_at",
				)
				.bind(ip)
				.fetch_all(&self.db)
				.await
			}
			None => {
				sqlx::query(
					"SELECT ip_address, reason, flagged_at FROM suspicious_ip
					ORDER BY flagged_at",
				)
				.fetch_all(&self.db)
				.await
			}
		}
		.map_err(db_err)?;
		collect_rows(rows, suspicious_from_row)
	}
}

// vim: ts=4
