//! The per-request governance pipeline.
//!
//! Two layers wrap the whole router: [`request_id`] on the outside and
//! [`track_request`] inside it. The pipeline stages run in a fixed
//! order (address resolution, blocklist gate, activity tracking,
//! geolocation, audit persistence, operational log) and only the gate
//! can refuse a request. Every later stage degrades on failure, so a
//! broken store or provider never turns into a 500 for the caller.

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::activity;
use crate::client_ip::resolve_client_ip;
use crate::extract::{ClientIp, RequestId};
use crate::geo;
use crate::prelude::*;
use ipwarden_types::cache_adapter::ActivityRecord;
use ipwarden_types::geo_adapter::GeoRecord;
use ipwarden_types::log_adapter::RequestLogEntry;

/// Body of the blocklist refusal.
pub const BLOCKED_BODY: &str = "Forbidden: Your IP has been blocked.";

/// Response header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Outermost layer. Tags the request with a fresh UUID v4, visible to
/// handlers as the [`RequestId`] extension and echoed to the caller in
/// the `X-Request-Id` response header.
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
	let id = Uuid::new_v4().to_string();
	req.extensions_mut().insert(RequestId(id.clone()));

	let mut response = next.run(req).await;
	if let Ok(value) = id.parse() {
		response.headers_mut().insert(REQUEST_ID_HEADER, value);
	}
	response
}

/// The governance pipeline itself, mounted with
/// `middleware::from_fn_with_state` under the [`request_id`] layer.
///
/// A blocklisted address is answered here with a fixed 403 and leaves
/// no audit trail entry; it shows up in the operational log only. For
/// everyone else the request is counted, enriched and persisted, then
/// forwarded unchanged with the resolved [`ClientIp`] attached.
pub async fn track_request(
	State(app): State<App>,
	mut req: Request<Body>,
	next: Next,
) -> Response {
	let request_id = req
		.extensions()
		.get::<RequestId>()
		.map(|RequestId(id)| id.clone())
		.unwrap_or_default();
	let ip = resolve_client_ip(&req, app.opts.trust_proxy);
	let path = req.uri().path().to_owned();

	if app.gate.check(&ip).await {
		warn!(request_id = %request_id, "Blocked request from blocklisted IP: {}", ip);
		return (StatusCode::FORBIDDEN, BLOCKED_BODY).into_response();
	}

	let record = match activity::record_visit(&app.cache_adapter, &ip, &path).await {
		Ok(record) => record,
		Err(err) => {
			error!(request_id = %request_id, "Activity tracking failed for {}: {}", ip, err);
			ActivityRecord::default()
		}
	};

	let location = geo::resolve(&app.cache_adapter, &app.geo_adapter, &ip).await;

	let entry = RequestLogEntry {
		ip_address: ip.clone(),
		timestamp: Timestamp::now(),
		path: path.as_str().into(),
		country: location.country.clone(),
		city: location.city.clone(),
	};
	if let Err(err) = app.log_adapter.append_request(&entry).await {
		error!(request_id = %request_id, "Failed to save request log for {}: {}", ip, err);
	}

	info!(request_id = %request_id, "{}", visit_line(&ip, &location, &path, record.count));

	req.extensions_mut().insert(ClientIp(ip));
	next.run(req).await
}

/// Operational log line of one admitted request.
fn visit_line(ip: &str, location: &GeoRecord, path: &str, count: u64) -> String {
	format!(
		"[{}] ({}, {}) -> {} | Count: {}",
		ip,
		location.country.as_deref().unwrap_or("None"),
		location.city.as_deref().unwrap_or("None"),
		path,
		count,
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn visit_line_renders_geo_fields() {
		let location = GeoRecord { country: Some("HU".into()), city: Some("Budapest".into()) };
		assert_eq!(
			visit_line("10.0.0.5", &location, "/home", 3),
			"[10.0.0.5] (HU, Budapest) -> /home | Count: 3"
		);
	}

	#[test]
	fn visit_line_renders_missing_geo_as_none() {
		assert_eq!(
			visit_line("10.0.0.5", &GeoRecord::unknown(), "/home", 1),
			"[10.0.0.5] (None, None) -> /home | Count: 1"
		);
	}

	#[test]
	fn visit_line_renders_partial_geo() {
		let location = GeoRecord { country: Some("DE".into()), city: None };
		assert_eq!(
			visit_line("2001:db8::1", &location, "/api/status", 12),
			"[2001:db8::1] (DE, None) -> /api/status | Count: 12"
		);
	}
}

// vim: ts=4
