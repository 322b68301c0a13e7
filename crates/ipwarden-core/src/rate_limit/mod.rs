//! Fixed-window rate limiting for guarded routes.
//!
//! Windows live in the shared expiring store as `rate:{class}:{id}`
//! counters, so limits survive across workers sharing one store and
//! cost nothing extra in process. The window is armed by the first
//! request and never slides.

pub mod error;
pub mod limiter;

pub use error::RateLimitError;
pub use limiter::{
	DEFAULT_ANON_QUOTA, DEFAULT_AUTH_QUOTA, IdentityClass, RateIdentity, RateLimiter, RateQuota,
	enforce,
};

// vim: ts=4
