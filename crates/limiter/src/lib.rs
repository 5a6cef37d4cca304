//! Retone admission control.
//!
//! A [`RateLimiter`] decides, before any outbound work is committed, whether
//! a client may make another request. Budgets are tracked per
//! [`ClientIdentity`] in fixed windows (hourly and daily by default) and the
//! limiter is an ordinary owned value: construct one and share it by
//! reference or `Arc`.
//!
//! ```
//! use limiter::{ClientIdentity, LimiterConfig, RateLimiter};
//! use std::time::Duration;
//!
//! let limiter = RateLimiter::new(
//!     LimiterConfig::default().with_short(2, Duration::from_secs(60)),
//! );
//! let client = ClientIdentity::from("192.0.2.7");
//!
//! assert!(limiter.try_admit(&client).is_ok());
//! assert!(limiter.try_admit(&client).is_ok());
//! let denied = limiter.try_admit(&client).unwrap_err();
//! assert!(denied.retry_after_secs() >= 1);
//! ```
mod config;
mod limiter;
mod window;

pub use crate::config::{LimiterConfig, LimiterConfigError, WindowConfig, DEFAULT_BURST};
pub use crate::limiter::{
    Admission, ClientIdentity, LimiterStats, RateLimitExceeded, RateLimiter,
};
pub use crate::window::WindowKind;
