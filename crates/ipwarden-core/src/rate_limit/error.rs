//! Rate limiting error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Why a guarded request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitError {
	/// Quota exhausted for the current window
	Limited {
		/// Seconds until the window resets
		retry_after: u32,
	},
}

impl std::fmt::Display for RateLimitError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			RateLimitError::Limited { retry_after } => {
				write!(f, "Rate limited, retry after {}s", retry_after)
			}
		}
	}
}

impl std::error::Error for RateLimitError {}

impl IntoResponse for RateLimitError {
	fn into_response(self) -> Response {
		match self {
			RateLimitError::Limited { retry_after } => {
				let body = serde_json::json!({
					"error": {
						"code": "E-RATE-LIMITED",
						"message": "Too many requests. Please slow down.",
						"details": {
							"retryAfter": retry_after
						}
					}
				});

				let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();

				if let Ok(val) = retry_after.to_string().parse() {
					response.headers_mut().insert("Retry-After", val);
				}

				response
			}
		}
	}
}


// vim: ts=4
