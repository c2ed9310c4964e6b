//! Gate configuration.
//!
//! All durations accept human-readable strings (`"5s"`, `"24h"`, `"3d"`).
//!
//! # Example (TOML)
//!
//! ```toml
//! [gate.rate_limit]
//! requests_per_window = 20
//! window = "5s"
//!
//! [gate.token]
//! secret = "an-hmac-secret"
//! lifetime = "3d"
//!
//! [gate.basic]
//! username = "ops"
//! password = "an-ops-password"
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root gate configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GateConfig {
    /// Fixed-window rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Bearer token signing and validation.
    pub token: TokenConfig,

    /// Principal cache behaviour.
    pub cache: CacheConfig,

    /// Persistent store call bounds.
    pub store: StoreConfig,

    /// Credentials for Basic-protected operational endpoints.
    pub basic: BasicAuthConfig,
}

/// Fixed-window rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// When false every request is admitted.
    pub enabled: bool,

    /// Requests admitted per key per window.
    pub requests_per_window: u32,

    /// Window length.
    #[serde(with = "humantime_serde")]
    pub window: Duration,

    /// Interval between sweeps of expired windows.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_window: 20,
            window: Duration::from_secs(5),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// HS256 token configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Shared HMAC secret. Must be set.
    pub secret: String,

    /// Expected and issued `iss` claim.
    pub issuer: String,

    /// Expected and issued `aud` claim.
    pub audience: String,

    /// Lifetime of issued tokens.
    #[serde(with = "humantime_serde")]
    pub lifetime: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: "gatehouse".to_string(),
            audience: "gatehouse".to_string(),
            lifetime: Duration::from_secs(3 * 24 * 3600),
        }
    }
}

/// Principal cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When false the resolver reads straight from the store.
    pub enabled: bool,

    /// TTL of cached principals.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(24 * 3600),
        }
    }
}

/// Persistent store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Upper bound on a single cache or store call.
    #[serde(with = "humantime_serde")]
    pub call_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(5),
        }
    }
}

/// Basic authentication credentials.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BasicAuthConfig {
    pub username: String,
    pub password: String,
}

impl Default for BasicAuthConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: String::new(),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl GateConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the token secret or Basic password is
    /// empty, and `ConfigError::InvalidValue` if a limit or duration is zero,
    /// a claim value is empty, or the Basic credentials are admin/admin.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.requests_per_window == 0 {
            return Err(ConfigError::InvalidValue(
                "rate_limit.requests_per_window must be > 0".to_string(),
            ));
        }

        if self.rate_limit.window.is_zero() {
            return Err(ConfigError::InvalidValue(
                "rate_limit.window must be > 0".to_string(),
            ));
        }

        if self.rate_limit.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "rate_limit.sweep_interval must be > 0".to_string(),
            ));
        }

        if self.token.secret.is_empty() {
            return Err(ConfigError::Missing("token.secret".to_string()));
        }

        if self.token.issuer.is_empty() || self.token.audience.is_empty() {
            return Err(ConfigError::InvalidValue(
                "token.issuer and token.audience cannot be empty".to_string(),
            ));
        }

        if self.token.lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "token.lifetime must be > 0".to_string(),
            ));
        }

        if self.cache.enabled && self.cache.ttl.is_zero() {
            return Err(ConfigError::InvalidValue(
                "cache.ttl must be > 0".to_string(),
            ));
        }

        if self.store.call_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "store.call_timeout must be > 0".to_string(),
            ));
        }

        if self.basic.username.is_empty() {
            return Err(ConfigError::InvalidValue(
                "basic.username cannot be empty".to_string(),
            ));
        }

        if self.basic.password.is_empty() {
            return Err(ConfigError::Missing("basic.password".to_string()));
        }

        if self.basic.username == "admin" && self.basic.password == "admin" {
            return Err(ConfigError::InvalidValue(
                "basic credentials must not be admin/admin".to_string(),
            ));
        }

        Ok(())
    }
}
