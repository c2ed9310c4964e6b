//! Cache-aside principal resolution.
//!
//! Reads try the cache first and fall back to the store on a miss, a cache
//! error, or a cache deadline. A successful store read repopulates the cache.
//! Absent principals are never cached, so a later insert is visible on the
//! next request.

use std::sync::Arc;
use std::time::Duration;

use gatehouse_core::{Principal, PrincipalId, RequestContext};
use gatehouse_storage::{PrincipalCache, PrincipalStorage};

use crate::config::{CacheConfig, StoreConfig};
use crate::error::{AuthError, AuthResult};

/// Resolves principals by id through an optional read-through cache.
#[derive(Clone)]
pub struct PrincipalResolver {
    principals: Arc<dyn PrincipalStorage>,
    cache: Option<Arc<dyn PrincipalCache>>,
    ttl: Duration,
    call_timeout: Duration,
}

impl PrincipalResolver {
    /// Creates a store-only resolver.
    #[must_use]
    pub fn new(principals: Arc<dyn PrincipalStorage>) -> Self {
        let cache = CacheConfig::default();
        let store = StoreConfig::default();
        Self {
            principals,
            cache: None,
            ttl: cache.ttl,
            call_timeout: store.call_timeout,
        }
    }

    /// Creates a resolver from configuration. The cache is attached only when
    /// `cache.enabled` is set.
    #[must_use]
    pub fn from_config(
        principals: Arc<dyn PrincipalStorage>,
        cache: Option<Arc<dyn PrincipalCache>>,
        cache_config: &CacheConfig,
        store_config: &StoreConfig,
    ) -> Self {
        Self {
            principals,
            cache: cache.filter(|_| cache_config.enabled),
            ttl: cache_config.ttl,
            call_timeout: store_config.call_timeout,
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn PrincipalCache>, ttl: Duration) -> Self {
        self.cache = Some(cache);
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    #[must_use]
    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    /// Returns the principal with the given id.
    ///
    /// Cache failures are logged and treated as misses.
    ///
    /// # Errors
    ///
    /// - `PrincipalNotFound` if the store has no active principal with that id
    /// - `StoreUnavailable` if the store fails, times out, or the request is cancelled
    pub async fn get(&self, ctx: &RequestContext, id: PrincipalId) -> AuthResult<Principal> {
        if let Some(cache) = &self.cache {
            match ctx.run(Some(self.call_timeout), cache.get(id)).await {
                Ok(Ok(Some(principal))) => {
                    tracing::debug!(principal_id = id, "principal cache hit");
                    return Ok(principal);
                }
                Ok(Ok(None)) => {
                    tracing::debug!(principal_id = id, "principal cache miss");
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        principal_id = id,
                        category = %e.category(),
                        error = %e,
                        "principal cache read failed"
                    );
                }
                Err(e) => {
                    tracing::warn!(principal_id = id, error = %e, "principal cache read aborted");
                }
            }
        }

        let found = match ctx
            .run(Some(self.call_timeout), self.principals.find_by_id(id))
            .await?
        {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(
                    principal_id = id,
                    category = %e.category(),
                    error = %e,
                    "principal store read failed"
                );
                return Err(e.into());
            }
        };
        let principal = found.ok_or(AuthError::PrincipalNotFound { id })?;

        if let Some(cache) = &self.cache {
            match ctx
                .run(Some(self.call_timeout), cache.set(&principal, self.ttl))
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(
                        principal_id = id,
                        category = %e.category(),
                        error = %e,
                        "principal cache populate failed"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        principal_id = id,
                        error = %e,
                        "principal cache populate aborted"
                    );
                }
            }
        }

        Ok(principal)
    }

    /// Refreshes the cached copy of `principal` after a mutation.
    ///
    /// # Errors
    ///
    /// Returns `CacheUnavailable` if the cache write fails or is aborted.
    pub async fn set(&self, ctx: &RequestContext, principal: &Principal) -> AuthResult<()> {
        let Some(cache) = &self.cache else {
            return Ok(());
        };

        ctx.run(Some(self.call_timeout), cache.set(principal, self.ttl))
            .await
            .map_err(|e| AuthError::cache_unavailable(e.to_string()))?
            .map_err(|e| AuthError::cache_unavailable(e.to_string()))
    }

    /// Drops any cached copy of the principal. Failures are logged only.
    pub async fn invalidate(&self, ctx: &RequestContext, id: PrincipalId) {
        let Some(cache) = &self.cache else {
            return;
        };

        match ctx.run(Some(self.call_timeout), cache.remove(id)).await {
            Ok(Ok(())) => tracing::debug!(principal_id = id, "principal cache invalidated"),
            Ok(Err(e)) => {
                tracing::warn!(
                    principal_id = id,
                    category = %e.category(),
                    error = %e,
                    "principal cache invalidation failed"
                );
            }
            Err(e) => {
                tracing::warn!(
                    principal_id = id,
                    error = %e,
                    "principal cache invalidation aborted"
                );
            }
        }
    }
}

impl std::fmt::Debug for PrincipalResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrincipalResolver")
            .field("cached", &self.cache.is_some())
            .field("ttl", &self.ttl)
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}
