//! Router assembly. The governance layers wrap every route of the
//! returned router; the rate limiter guards only the routes mounted
//! under it.

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::post;

use crate::app::App;
use crate::extract::ClientIp;
use crate::middleware::{request_id, track_request};
use crate::rate_limit;

/// Demonstration login endpoint; deployments replace it with a real
/// one and keep the guard.
async fn post_login() -> &'static str {
	"Login successful"
}

/// Catch-all answering with the resolved client address, so every path
/// exercises the pipeline.
async fn any_request(ClientIp(ip): ClientIp) -> String {
	format!("Hello, {}\n", ip)
}

pub fn init(app: App) -> Router {
	let guarded = Router::new()
		.route("/login", post(post_login))
		.route_layer(from_fn_with_state(app.clone(), rate_limit::enforce));

	Router::new()
		.merge(guarded)
		.fallback(any_request)
		.layer(from_fn_with_state(app, track_request))
		.layer(from_fn(request_id))
}

// vim: ts=4
