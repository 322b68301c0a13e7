//! Database schema initialization
//!
//! Creates the tables and indexes used by the adapter. Everything is
//! `IF NOT EXISTS` so re-opening an existing database is a no-op.

use sqlx::SqlitePool;

pub(crate) async fn init_db(db: &SqlitePool) -> Result<(), sqlx::Error> {
	let mut tx = db.begin().await?;

	// Request audit trail
	//*********************
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS request_log (
		log_id integer PRIMARY KEY AUTOINCREMENT,
		ip_address text NOT NULL,
		timestamp integer NOT NULL,
		path text NOT NULL,
		country text,
		city text
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_request_log_ip ON request_log(ip_address)")
		.execute(&mut *tx)
		.await?;
	sqlx::query("CREATE INDEX IF NOT EXISTS idx_request_log_ts ON request_log(timestamp)")
		.execute(&mut *tx)
		.await?;

	// Operator blocklist
	//********************
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS blocked_ip (
		ip_address text NOT NULL,
		reason text,
		created_at integer NOT NULL DEFAULT (unixepoch()),
		PRIMARY KEY(ip_address)
	)",
	)
	.execute(&mut *tx)
	.await?;

	// Scanner findings
	//******************
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS suspicious_ip (
		ip_address text NOT NULL,
		reason text NOT NULL,
		flagged_at integer NOT NULL,
		PRIMARY KEY(ip_address, reason)
	)",
	)
	.execute(&mut *tx)
	.await?;

	tx.commit().await
}

// vim: ts=4
