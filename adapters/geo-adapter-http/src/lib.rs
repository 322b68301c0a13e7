//! Geolocation provider adapters.
//!
//! [`GeoAdapterHttp`] talks to an ip-api.com style JSON endpoint:
//! `GET {base_url}/{ip}` answering `{"status":"success","countryCode":
//! "DE","city":"Berlin"}` on success and `{"status":"fail","message":
//! "..."}` otherwise. [`GeoAdapterStatic`] answers every lookup with one
//! fixed record, for deployments without a provider and for tests.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use ipwarden::geo_adapter::{GeoAdapter, GeoRecord};
use ipwarden::prelude::*;

#[derive(Debug, Deserialize)]
struct ProviderResponse {
	status: Box<str>,
	#[serde(default)]
	message: Option<Box<str>>,
	#[serde(rename = "countryCode", default)]
	country_code: Option<Box<str>>,
	#[serde(default)]
	city: Option<Box<str>>,
}

fn record_from_response(payload: ProviderResponse) -> IwResult<GeoRecord> {
	if payload.status.as_ref() != "success" {
		let message = payload.message.unwrap_or_else(|| "unspecified provider failure".into());
		return Err(Error::GeoError(message));
	}
	Ok(GeoRecord { country: payload.country_code, city: payload.city })
}

fn provider_err(err: &reqwest::Error) -> Error {
	if err.is_timeout() {
		Error::Timeout("geo provider".into())
	} else {
		Error::GeoError(err.to_string().into())
	}
}

/// Provider adapter backed by an HTTP JSON endpoint.
#[derive(Debug)]
pub struct GeoAdapterHttp {
	client: Client,
	base_url: Box<str>,
	api_key: Option<Box<str>>,
}

impl GeoAdapterHttp {
	/// `base_url` without a trailing slash, e.g. `http://ip-api.com/json`.
	/// `api_key`, when present, is sent as a bearer token.
	pub fn new(base_url: &str, api_key: Option<&str>, timeout_ms: u64) -> IwResult<Self> {
		let client = Client::builder()
			.timeout(Duration::from_millis(timeout_ms))
			.build()
			.map_err(|err| Error::ConfigError(err.to_string().into()))?;

		Ok(Self {
			client,
			base_url: base_url.trim_end_matches('/').into(),
			api_key: api_key.map(Into::into),
		})
	}
}

#[async_trait]
impl GeoAdapter for GeoAdapterHttp {
	async fn lookup(&self, ip: &str) -> IwResult<GeoRecord> {
		let url = format!("{}/{}?fields=status,message,countryCode,city", self.base_url, ip);
		debug!(ip = %ip, "querying geo provider");

		let mut req = self.client.get(&url).header("Accept", "application/json");
		if let Some(key) = &self.api_key {
			req = req.bearer_auth(key.as_ref());
		}

		let response = req.send().await.map_err(|err| provider_err(&err))?;
		if !response.status().is_success() {
			return Err(Error::GeoError(
				format!("provider returned HTTP {}", response.status()).into(),
			));
		}

		let payload: ProviderResponse =
			response.json().await.map_err(|err| provider_err(&err))?;
		record_from_response(payload)
	}
}

/// Provider adapter that answers every lookup with the same record.
#[derive(Debug, Default)]
pub struct GeoAdapterStatic {
	record: GeoRecord,
}

impl GeoAdapterStatic {
	pub fn new(record: GeoRecord) -> Self {
		Self { record }
	}

	/// Adapter that knows nothing about any address.
	pub fn unknown() -> Self {
		Self::default()
	}
}

#[async_trait]
impl GeoAdapter for GeoAdapterStatic {
	async fn lookup(&self, _ip: &str) -> IwResult<GeoRecord> {
		Ok(self.record.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(json: &str) -> ProviderResponse {
		serde_json::from_str(json).unwrap()
	}

	#[test]
	fn success_response_maps_to_record() {
		let payload =
			parse(r#"{"status":"success","countryCode":"DE","city":"Berlin"}"#);
		let record = record_from_response(payload).unwrap();
		assert_eq!(record.country.as_deref(), Some("DE"));
		assert_eq!(record.city.as_deref(), Some("Berlin"));
	}

	#[test]
	fn success_with_missing_fields_is_partial() {
		let payload = parse(r#"{"status":"success","countryCode":"HU"}"#);
		let record = record_from_response(payload).unwrap();
		assert_eq!(record.country.as_deref(), Some("HU"));
		assert_eq!(record.city, None);
	}

	#[test]
	fn fail_status_is_an_error_with_provider_message() {
		let payload = parse(r#"{"status":"fail","message":"private range"}"#);
		let err = record_from_response(payload).unwrap_err();
		assert!(matches!(err, Error::GeoError(msg) if msg.as_ref() == "private range"));
	}

	#[test]
	fn fail_status_without_message_still_errors() {
		let payload = parse(r#"{"status":"fail"}"#);
		assert!(record_from_response(payload).is_err());
	}

	#[tokio::test]
	async fn static_adapter_returns_fixed_record() {
		let adapter = GeoAdapterStatic::new(GeoRecord {
			country: Some("HU".into()),
			city: Some("Budapest".into()),
		});
		let record = adapter.lookup("1.2.3.4").await.unwrap();
		assert_eq!(record.country.as_deref(), Some("HU"));

		let unknown = GeoAdapterStatic::unknown().lookup("1.2.3.4").await.unwrap();
		assert_eq!(unknown, GeoRecord::unknown());
	}
}

// vim: ts=4
