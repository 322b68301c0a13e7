//! Core of the ipwarden IP governance layer.
//!
//! Everything on the hot request path lives here: client address
//! resolution, the blocklist gate, per-window activity tracking, cached
//! geolocation, the request middleware tying them together, and the
//! fixed-window rate limiter. Off the hot path: the suspicious-activity
//! scanner and the task scheduler it runs on. Storage and the external
//! geolocation provider plug in through the adapter traits defined in
//! `ipwarden-types`.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod activity;
pub mod app;
pub mod block;
pub mod client_ip;
pub mod extract;
pub mod geo;
pub mod maintenance;
pub mod middleware;
pub mod prelude;
pub mod rate_limit;
pub mod scanner;
pub mod scheduler;

// Re-export commonly used types
pub use app::{App, AppBuilder, AppOpts, AppState};
pub use extract::{AuthUser, ClientIp, OptionalAuthUser, OptionalRequestId, RequestId};

// vim: ts=4
