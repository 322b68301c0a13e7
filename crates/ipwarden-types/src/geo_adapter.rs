//! Adapter for the external geolocation provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fmt::Debug;

use crate::prelude::*;

/// Best-effort geolocation of one address, stored as JSON under a
/// `geo:{ip}` key. Both fields absent means "unknown", which is a valid
/// answer, not an error.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct GeoRecord {
	pub country: Option<Box<str>>,
	pub city: Option<Box<str>>,
}

impl GeoRecord {
	pub fn unknown() -> Self {
		Self::default()
	}
}

#[async_trait]
pub trait GeoAdapter: Debug + Send + Sync {
	/// Resolve `ip` with the provider. May fail or time out; the caller
	/// degrades failures to [`GeoRecord::unknown`] and never caches them.
	async fn lookup(&self, ip: &str) -> IwResult<GeoRecord>;
}


// vim: ts=4
