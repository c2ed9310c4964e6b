//! Shared principal cache stored in Redis.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::Pool;
use gatehouse_core::{Principal, PrincipalId};
use gatehouse_storage::{CacheError, CacheResult, PrincipalCache, principal_cache_key};
use redis::AsyncCommands;

/// Principal cache backed by a deadpool-redis pool.
///
/// Values are JSON documents under `principal-{id}`, written with `SET EX`
/// so Redis expires them on its own.
#[derive(Clone)]
pub struct RedisPrincipalCache {
    pool: Pool,
}

impl RedisPrincipalCache {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn connection(&self) -> CacheResult<deadpool_redis::Connection> {
        self.pool.get().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to get Redis connection");
            CacheError::connection(e.to_string())
        })
    }

    /// Check if Redis is reachable (for health checks).
    pub async fn is_available(&self) -> bool {
        self.pool.get().await.is_ok()
    }
}

#[async_trait]
impl PrincipalCache for RedisPrincipalCache {
    async fn get(&self, id: PrincipalId) -> CacheResult<Option<Principal>> {
        let key = principal_cache_key(id);
        let mut conn = self.connection().await?;
        let data = conn
            .get::<_, Option<Vec<u8>>>(&key)
            .await
            .map_err(|e| {
                tracing::warn!(key = %key, error = %e, "Redis GET error");
                CacheError::connection(e.to_string())
            })?;

        match data {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| CacheError::serialization(e.to_string())),
            None => Ok(None),
        }
    }

    async fn set(&self, principal: &Principal, ttl: Duration) -> CacheResult<()> {
        let key = principal_cache_key(principal.id);
        let data =
            serde_json::to_vec(principal).map_err(|e| CacheError::serialization(e.to_string()))?;
        let ttl_secs = ttl.as_secs().max(1);

        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(&key, data, ttl_secs)
            .await
            .map_err(|e| {
                tracing::warn!(key = %key, error = %e, "Redis SET error");
                CacheError::connection(e.to_string())
            })?;

        tracing::debug!(key = %key, ttl_secs, "principal cached");
        Ok(())
    }

    async fn remove(&self, id: PrincipalId) -> CacheResult<()> {
        let key = principal_cache_key(id);
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(&key).await.map_err(|e| {
            tracing::warn!(key = %key, error = %e, "Redis DEL error");
            CacheError::connection(e.to_string())
        })
    }
}
