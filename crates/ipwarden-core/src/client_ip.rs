//! Client address resolution.
//!
//! The resolved address is the identity everything downstream keys on
//! (blocklist, activity window, rate limiter), so resolution never
//! fails: a request whose address cannot be determined gets the
//! [`UNRESOLVED_ADDR`] sentinel and is governed under that.

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::Request;

/// Sentinel address for requests whose origin cannot be determined.
pub const UNRESOLVED_ADDR: &str = "0.0.0.0";

/// Resolve the client address of `req`.
///
/// With `trust_proxy` set the forwarding headers are consulted first
/// (`X-Forwarded-For`, then `X-Real-IP`, then RFC 7239 `Forwarded`),
/// falling back to the socket peer; without it only the peer counts,
/// so spoofed headers from direct clients are ignored.
pub fn resolve_client_ip<B>(req: &Request<B>, trust_proxy: bool) -> Box<str> {
	let addr = if trust_proxy {
		from_xff(req)
			.or_else(|| from_x_real_ip(req))
			.or_else(|| from_forwarded(req))
			.or_else(|| peer_addr(req))
	} else {
		peer_addr(req)
	};

	match addr {
		Some(ip) => ip.to_string().into(),
		None => UNRESOLVED_ADDR.into(),
	}
}

fn peer_addr<B>(req: &Request<B>) -> Option<IpAddr> {
	req.extensions().get::<ConnectInfo<SocketAddr>>().map(|ci| ci.0.ip())
}

/// X-Forwarded-For can list multiple hops: "client, proxy1, proxy2".
/// The leftmost entry is the original client.
fn from_xff<B>(req: &Request<B>) -> Option<IpAddr> {
	req.headers()
		.get("x-forwarded-for")
		.and_then(|h| h.to_str().ok())
		.and_then(|s| s.split(',').next().map(str::trim).and_then(|ip| ip.parse().ok()))
}

fn from_x_real_ip<B>(req: &Request<B>) -> Option<IpAddr> {
	req.headers()
		.get("x-real-ip")
		.and_then(|h| h.to_str().ok())
		.and_then(|s| s.trim().parse().ok())
}

/// Forwarded header (RFC 7239): "for=192.0.2.60;proto=http;by=..." or
/// quoted IPv6 "for=\"[2001:db8::1]\"".
fn from_forwarded<B>(req: &Request<B>) -> Option<IpAddr> {
	req.headers().get("forwarded").and_then(|h| h.to_str().ok()).and_then(|s| {
		s.split(';')
			.find(|part| part.trim().to_lowercase().starts_with("for="))
			.and_then(|for_part| {
				let value = for_part
					.trim()
					.strip_prefix("for=")
					.or_else(|| for_part.trim().strip_prefix("FOR="))?;
				let cleaned = value.trim_matches('"').trim_matches('[').trim_matches(']');
				cleaned.parse().ok()
			})
	})
}


// vim: ts=4
