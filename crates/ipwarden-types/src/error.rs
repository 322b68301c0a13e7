//! Error types shared across the workspace.
//!
//! Governance code degrades most failures instead of returning them to
//! callers (see the middleware and geo cache), so these errors mostly
//! travel between adapters and the core, not out to HTTP clients. The
//! `IntoResponse` impl exists for the few places that do surface them
//! (startup handlers, admin-style listings).

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub type IwResult<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
	/// Durable store operation failed
	DbError(Box<str>),
	/// Expiring key-value store operation failed
	CacheError(Box<str>),
	/// Geolocation provider failed or answered with garbage
	GeoError(Box<str>),
	/// Invalid configuration, detected at startup
	ConfigError(Box<str>),
	/// Input failed validation
	ValidationError(Box<str>),
	/// Entity not found
	NotFound,
	/// Operation exceeded its deadline
	Timeout(Box<str>),
	/// Parse failure
	Parse,
	/// I/O failure
	IoError(Box<str>),
	/// Catch-all internal error
	Internal(Box<str>),
}

impl Error {
	/// Stable machine-readable code used in the JSON error envelope.
	pub fn code(&self) -> &'static str {
		match self {
			Error::DbError(_) => "E-DB",
			Error::CacheError(_) => "E-CACHE",
			Error::GeoError(_) => "E-GEO",
			Error::ConfigError(_) => "E-CONFIG",
			Error::ValidationError(_) => "E-VALIDATION",
			Error::NotFound => "E-NOT-FOUND",
			Error::Timeout(_) => "E-TIMEOUT",
			Error::Parse => "E-PARSE",
			Error::IoError(_) => "E-IO",
			Error::Internal(_) => "E-INTERNAL",
		}
	}
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Error::DbError(msg) => write!(f, "database error: {}", msg),
			Error::CacheError(msg) => write!(f, "cache error: {}", msg),
			Error::GeoError(msg) => write!(f, "geo lookup error: {}", msg),
			Error::ConfigError(msg) => write!(f, "configuration error: {}", msg),
			Error::ValidationError(msg) => write!(f, "validation error: {}", msg),
			Error::NotFound => write!(f, "not found"),
			Error::Timeout(msg) => write!(f, "timeout: {}", msg),
			Error::Parse => write!(f, "parse error"),
			Error::IoError(msg) => write!(f, "i/o error: {}", msg),
			Error::Internal(msg) => write!(f, "internal error: {}", msg),
		}
	}
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Error::IoError(err.to_string().into())
	}
}

impl From<serde_json::Error> for Error {
	fn from(_err: serde_json::Error) -> Self {
		Error::Parse
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> axum::response::Response {
		let status = match &self {
			Error::NotFound => StatusCode::NOT_FOUND,
			Error::ValidationError(_) => StatusCode::BAD_REQUEST,
			Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
			_ => StatusCode::INTERNAL_SERVER_ERROR,
		};
		let body = Json(json!({
			"error": {
				"code": self.code(),
				"message": self.to_string(),
			}
		}));
		(status, body).into_response()
	}
}


// vim: ts=4
