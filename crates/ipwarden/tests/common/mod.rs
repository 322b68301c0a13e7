//! Shared fixtures for the workspace integration tests.
#![allow(dead_code)]

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::response::Response;
use http_body_util::BodyExt;
use tempfile::TempDir;

use ipwarden::app::{App, AppBuilder};
use ipwarden::error::{Error, IwResult};
use ipwarden::geo_adapter::{GeoAdapter, GeoRecord};
use ipwarden::routes;
use ipwarden_cache_adapter_memory::CacheAdapterMemory;
use ipwarden_log_adapter_sqlite::LogAdapterSqlite;

/// Geolocation fake answering every lookup with one record (or a
/// provider error when constructed with [`CountingGeo::failing`]) and
/// counting the calls.
#[derive(Debug)]
pub struct CountingGeo {
	answer: Option<GeoRecord>,
	lookups: AtomicUsize,
}

impl CountingGeo {
	pub fn with(country: &str, city: &str) -> Self {
		Self {
			answer: Some(GeoRecord { country: Some(country.into()), city: Some(city.into()) }),
			lookups: AtomicUsize::new(0),
		}
	}

	pub fn failing() -> Self {
		Self { answer: None, lookups: AtomicUsize::new(0) }
	}

	pub fn lookups(&self) -> usize {
		self.lookups.load(Ordering::Relaxed)
	}
}

#[async_trait]
impl GeoAdapter for CountingGeo {
	async fn lookup(&self, ip: &str) -> IwResult<GeoRecord> {
		self.lookups.fetch_add(1, Ordering::Relaxed);
		match &self.answer {
			Some(record) => Ok(record.clone()),
			None => Err(Error::GeoError(format!("no route to provider for {}", ip).into())),
		}
	}
}

/// A fully wired application over a temp SQLite store, the in-memory
/// cache, and a counting geo fake, plus the assembled router.
pub struct TestEnv {
	pub app: App,
	pub router: Router,
	pub log: Arc<LogAdapterSqlite>,
	pub geo: Arc<CountingGeo>,
	_tmp: TempDir,
}

pub async fn env() -> TestEnv {
	env_with(|_| {}).await
}

pub async fn env_with(configure: impl FnOnce(&mut AppBuilder)) -> TestEnv {
	let tmp = TempDir::new().expect("Failed to create temp directory");
	let log = Arc::new(
		LogAdapterSqlite::new(tmp.path().join("governance.db"))
			.await
			.expect("Failed to create log adapter"),
	);
	let geo = Arc::new(CountingGeo::with("HU", "Budapest"));

	let mut builder = AppBuilder::new();
	builder
		.cache_adapter(Arc::new(CacheAdapterMemory::new()))
		.log_adapter(log.clone())
		.geo_adapter(geo.clone());
	configure(&mut builder);
	let app = builder.build().expect("Failed to build app");
	let router = routes::init(app.clone());

	TestEnv { app, router, log, geo, _tmp: tmp }
}

/// GET request carrying `peer` as the connection address, the way the
/// listener would attach it.
pub fn get(path: &str, peer: &str) -> Request<Body> {
	Request::builder()
		.uri(path)
		.extension(ConnectInfo(peer_addr(peer)))
		.body(Body::empty())
		.expect("request")
}

pub fn post(path: &str, peer: &str) -> Request<Body> {
	Request::builder()
		.method("POST")
		.uri(path)
		.extension(ConnectInfo(peer_addr(peer)))
		.body(Body::empty())
		.expect("request")
}

fn peer_addr(peer: &str) -> SocketAddr {
	SocketAddr::from((peer.parse::<IpAddr>().expect("peer address"), 40000))
}

pub async fn body_text(response: Response) -> String {
	let bytes = response.into_body().collect().await.expect("body").to_bytes();
	String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

// vim: ts=4
