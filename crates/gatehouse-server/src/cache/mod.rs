//! Principal cache backends.
//!
//! - **Local**: single-instance mode, a `DashMap` per process
//! - **Redis**: multi-instance mode, entries shared across every instance
//!
//! If Redis is disabled or unreachable at start-up the server falls back to
//! the local backend.

pub mod local;
pub mod redis;

use std::sync::Arc;
use std::time::Duration;

use gatehouse_storage::PrincipalCache;
use serde_json::{Value, json};

pub use self::local::{CacheStats, LocalPrincipalCache};
pub use self::redis::RedisPrincipalCache;

use crate::config::RedisConfig;

/// The principal cache selected at start-up.
#[derive(Clone)]
pub enum PrincipalCacheBackend {
    Local(Arc<LocalPrincipalCache>),
    Redis(Arc<RedisPrincipalCache>),
}

impl PrincipalCacheBackend {
    pub fn new_local() -> Self {
        Self::Local(Arc::new(LocalPrincipalCache::new()))
    }

    /// The backend as the trait object the resolver consumes.
    pub fn shared(&self) -> Arc<dyn PrincipalCache> {
        match self {
            Self::Local(cache) => cache.clone(),
            Self::Redis(cache) => cache.clone(),
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::Redis(_) => "redis",
        }
    }

    /// Backend state for the health endpoint. Redis is pinged; the local
    /// cache reports its counters.
    pub async fn health(&self) -> Value {
        match self {
            Self::Local(cache) => {
                let stats = cache.stats();
                json!({
                    "mode": self.mode(),
                    "reachable": true,
                    "size": stats.size,
                    "hits": stats.hits,
                    "misses": stats.misses,
                    "evictions": stats.evictions,
                    "hit_rate": stats.hit_rate(),
                })
            }
            Self::Redis(cache) => json!({
                "mode": self.mode(),
                "reachable": cache.is_available().await,
            }),
        }
    }

    pub fn local(&self) -> Option<&Arc<LocalPrincipalCache>> {
        match self {
            Self::Local(cache) => Some(cache),
            Self::Redis(_) => None,
        }
    }
}

/// Create the principal cache backend based on configuration.
///
/// Uses Redis when it is enabled and answers a connection attempt, otherwise
/// a local cache.
pub async fn create_principal_cache(config: &RedisConfig) -> PrincipalCacheBackend {
    if !config.enabled {
        tracing::info!("Redis disabled, using local principal cache");
        return PrincipalCacheBackend::new_local();
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    let timeout = Duration::from_millis(config.timeout_ms);
    let mut pool_config = deadpool_redis::PoolConfig::new(config.pool_size);
    pool_config.timeouts.wait = Some(timeout);
    pool_config.timeouts.create = Some(timeout);
    pool_config.timeouts.recycle = Some(timeout);

    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    redis_config.pool = Some(pool_config);

    let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to local principal cache."
            );
            return PrincipalCacheBackend::new_local();
        }
    };

    match pool.get().await {
        Ok(_) => {
            tracing::info!("Connected to Redis");
            PrincipalCacheBackend::Redis(Arc::new(RedisPrincipalCache::new(pool)))
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to connect to Redis. Falling back to local principal cache."
            );
            PrincipalCacheBackend::new_local()
        }
    }
}
