//! Fixed-window rate limiter.
//!
//! Each key gets a counter and a window start. A request is admitted while the
//! counter is below the limit; the counter resets in place the first time the
//! key is seen after its window has elapsed. A client can therefore send up to
//! twice the limit across a window boundary.
//!
//! Windows for keys that stop sending are reclaimed by
//! [`FixedWindowRateLimiter::purge_expired`], which the sweeper task runs
//! periodically.

use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::RateLimitConfig;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Time until the key's window closes. Zero when allowed.
    pub retry_after: Duration,
}

impl RateDecision {
    const fn allow() -> Self {
        Self {
            allowed: true,
            retry_after: Duration::ZERO,
        }
    }

    const fn deny(retry_after: Duration) -> Self {
        Self {
            allowed: false,
            retry_after,
        }
    }
}

#[derive(Debug)]
struct RateWindow {
    count: u32,
    window_start: Instant,
}

/// Per-key fixed-window rate limiter.
///
/// Check-and-increment for a key runs under that key's shard lock, so
/// concurrent callers never admit more than `limit` requests per window.
#[derive(Debug)]
pub struct FixedWindowRateLimiter {
    windows: DashMap<String, RateWindow>,
    limit: u32,
    window: Duration,
    enabled: bool,
}

impl FixedWindowRateLimiter {
    /// Creates an enabled limiter admitting `limit` requests per `window`.
    #[must_use]
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            limit,
            window,
            enabled: true,
        }
    }

    /// Creates a limiter from configuration.
    #[must_use]
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            enabled: config.enabled,
            ..Self::new(config.requests_per_window, config.window)
        }
    }

    /// Creates a limiter that admits everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(u32::MAX, Duration::from_secs(1))
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of keys currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Checks and records one request for `key`.
    pub fn allow(&self, key: &str) -> RateDecision {
        if !self.enabled {
            return RateDecision::allow();
        }

        let now = Instant::now();

        if let Some(mut window) = self.windows.get_mut(key) {
            return self.admit(&mut window, now);
        }

        let mut window = self
            .windows
            .entry(key.to_owned())
            .or_insert_with(|| RateWindow {
                count: 0,
                window_start: now,
            });
        self.admit(&mut window, now)
    }

    fn admit(&self, state: &mut RateWindow, now: Instant) -> RateDecision {
        let mut elapsed = now.saturating_duration_since(state.window_start);
        if elapsed >= self.window {
            state.count = 0;
            state.window_start = now;
            elapsed = Duration::ZERO;
        }

        if state.count < self.limit {
            state.count += 1;
            RateDecision::allow()
        } else {
            RateDecision::deny(self.window - elapsed)
        }
    }

    /// Removes every window that has elapsed. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows
            .retain(|_, state| now.saturating_duration_since(state.window_start) < self.window);
        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.windows.len(), "Purged expired rate windows");
        }
        removed
    }

    /// Spawns a task that calls [`purge_expired`](Self::purge_expired) every
    /// `interval`. The task ends once the limiter is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let limiter: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(limiter) = limiter.upgrade() else {
                    break;
                };
                limiter.purge_expired();
            }
        })
    }
}
