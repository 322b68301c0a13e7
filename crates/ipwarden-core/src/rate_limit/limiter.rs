//! Fixed-window limiter over the shared store.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::app::App;
use crate::client_ip::resolve_client_ip;
use crate::extract::{AuthUser, ClientIp};
use crate::prelude::*;
use crate::rate_limit::error::RateLimitError;
use ipwarden_types::cache_adapter::CacheAdapter;

/// Allowance for one identity class inside one fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateQuota {
	pub max_requests: u64,
	pub window_secs: u32,
}

impl RateQuota {
	pub const fn new(max_requests: u64, window_secs: u32) -> Self {
		Self { max_requests, window_secs }
	}
}

/// Recognized callers get 10 requests per minute on guarded routes.
pub const DEFAULT_AUTH_QUOTA: RateQuota = RateQuota::new(10, 60);

/// Anonymous callers get 5 requests per minute on guarded routes.
pub const DEFAULT_ANON_QUOTA: RateQuota = RateQuota::new(5, 60);

// IdentityClass //
//***************//

/// The two populations limited separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityClass {
	Authenticated,
	Anonymous,
}

impl IdentityClass {
	/// Class tag used in store keys.
	pub fn as_str(self) -> &'static str {
		match self {
			IdentityClass::Authenticated => "user",
			IdentityClass::Anonymous => "ip",
		}
	}
}

// RateIdentity //
//**************//

/// Who a guarded request is attributed to. A recognized user is limited
/// by identity across addresses; everyone else by address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateIdentity {
	User(Box<str>),
	Ip(Box<str>),
}

impl RateIdentity {
	/// Attribute `req`. An authenticated principal wins over the
	/// address. The address comes from the request pipeline when it
	/// already ran; otherwise it is resolved here, so a guard mounted
	/// without the pipeline still limits correctly.
	pub fn of_request<B>(req: &Request<B>, trust_proxy: bool) -> Self {
		if let Some(AuthUser(user)) = req.extensions().get::<AuthUser>() {
			return RateIdentity::User(user.clone());
		}
		match req.extensions().get::<ClientIp>() {
			Some(ClientIp(ip)) => RateIdentity::Ip(ip.clone()),
			None => RateIdentity::Ip(resolve_client_ip(req, trust_proxy)),
		}
	}

	pub fn class(&self) -> IdentityClass {
		match self {
			RateIdentity::User(_) => IdentityClass::Authenticated,
			RateIdentity::Ip(_) => IdentityClass::Anonymous,
		}
	}

	/// Store key of this identity's window, `rate:{class}:{identity}`.
	pub fn key(&self) -> String {
		let id = match self {
			RateIdentity::User(id) | RateIdentity::Ip(id) => id,
		};
		format!("rate:{}:{}", self.class().as_str(), id)
	}
}

// RateLimiter //
//*************//

/// Counts guarded requests per identity in fixed windows. The window is
/// armed by the first request and never slides; the counter's TTL in
/// the store is the window.
#[derive(Debug)]
pub struct RateLimiter {
	cache: Arc<dyn CacheAdapter>,
	authenticated: RateQuota,
	anonymous: RateQuota,
}

impl RateLimiter {
	pub fn new(cache: Arc<dyn CacheAdapter>) -> Self {
		Self::with_quotas(cache, DEFAULT_AUTH_QUOTA, DEFAULT_ANON_QUOTA)
	}

	pub fn with_quotas(
		cache: Arc<dyn CacheAdapter>,
		authenticated: RateQuota,
		anonymous: RateQuota,
	) -> Self {
		Self { cache, authenticated, anonymous }
	}

	/// Quota that applies to `class`.
	pub fn select_limit(&self, class: IdentityClass) -> RateQuota {
		match class {
			IdentityClass::Authenticated => self.authenticated,
			IdentityClass::Anonymous => self.anonymous,
		}
	}

	/// Count `identity` against its window and decide admission. A store
	/// failure admits the request; a broken cache must not lock every
	/// caller out.
	pub async fn check(&self, identity: &RateIdentity) -> Result<(), RateLimitError> {
		let quota = self.select_limit(identity.class());
		let key = identity.key();

		let counter = match self.cache.increment(&key, quota.window_secs).await {
			Ok(counter) => counter,
			Err(err) => {
				error!("Rate limit check failed for {}: {}", key, err);
				return Ok(());
			}
		};

		if counter.count > quota.max_requests {
			return Err(RateLimitError::Limited { retry_after: counter.expires_in });
		}
		Ok(())
	}
}

/// Route guard, mounted per route with `middleware::from_fn_with_state`.
/// Limited requests are answered here and never reach the handler.
pub async fn enforce(State(app): State<App>, req: Request<Body>, next: Next) -> Response {
	let identity = RateIdentity::of_request(&req, app.opts.trust_proxy);
	match app.limiter.check(&identity).await {
		Ok(()) => next.run(req).await,
		Err(err) => {
			warn!("Refusing {}: {}", identity.key(), err);
			err.into_response()
		}
	}
}


// vim: ts=4
