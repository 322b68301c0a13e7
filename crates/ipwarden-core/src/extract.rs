//! Request extension extractors

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::prelude::*;

// ClientIp //
//**********//
/// Client address resolved by the tracking middleware.
#[derive(Debug, Clone)]
pub struct ClientIp(pub Box<str>);

impl<S> FromRequestParts<S> for ClientIp
where
	S: Send + Sync,
{
	type Rejection = Error;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		parts
			.extensions
			.get::<ClientIp>()
			.cloned()
			.ok_or(Error::Internal("client address not resolved for this route".into()))
	}
}

// AuthUser //
//**********//
/// Authenticated caller identity, inserted by an upstream auth layer.
/// The rate limiter prefers this over the client address.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Box<str>);

/// Optional variant that doesn't fail for anonymous callers
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<Box<str>>);

impl<S> FromRequestParts<S> for OptionalAuthUser
where
	S: Send + Sync,
{
	type Rejection = Error;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		let user = parts.extensions.get::<AuthUser>().cloned().map(|u| u.0);
		Ok(OptionalAuthUser(user))
	}
}

// RequestId //
//***********//
/// Request ID for tracing and debugging
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

/// Optional Request ID extractor - always succeeds, returns None if not available
#[derive(Clone, Debug)]
pub struct OptionalRequestId(pub Option<String>);

impl<S> FromRequestParts<S> for OptionalRequestId
where
	S: Send + Sync,
{
	type Rejection = Error;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		let req_id = parts.extensions.get::<RequestId>().map(|r| r.0.clone());
		Ok(OptionalRequestId(req_id))
	}
}

// vim: ts=4
