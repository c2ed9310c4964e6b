//! Request rate limiting.
//!
//! - [`FixedWindowRateLimiter`]: per-key counters over fixed time windows.
//! - [`RateDecision`]: the outcome of a single admission check.

mod fixed_window;

pub use fixed_window::{FixedWindowRateLimiter, RateDecision};
