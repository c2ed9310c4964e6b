//! Per-instance principal cache backed by a `DashMap`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use gatehouse_core::{Principal, PrincipalId};
use gatehouse_storage::{CacheResult, PrincipalCache};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of entries currently in the cache.
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    /// Number of entries dropped because their TTL passed.
    pub evictions: u64,
}

impl CacheStats {
    /// Hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

struct CachedEntry {
    principal: Principal,
    expires_at: Instant,
}

impl CachedEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-memory principal cache with per-entry expiry.
#[derive(Default)]
pub struct LocalPrincipalCache {
    entries: DashMap<PrincipalId, CachedEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl LocalPrincipalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
            tracing::debug!(removed, "expired principal cache entries removed");
        }
        removed
    }

    /// Runs [`cleanup_expired`](Self::cleanup_expired) every `interval` until
    /// the cache is dropped.
    pub fn spawn_cleanup(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                cache.cleanup_expired();
            }
        })
    }
}

#[async_trait]
impl PrincipalCache for LocalPrincipalCache {
    async fn get(&self, id: PrincipalId) -> CacheResult<Option<Principal>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(&id) {
            if !entry.is_expired(now) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Some(entry.principal.clone()));
            }
            drop(entry);
            if self
                .entries
                .remove_if(&id, |_, entry| entry.is_expired(now))
                .is_some()
            {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    async fn set(&self, principal: &Principal, ttl: Duration) -> CacheResult<()> {
        self.entries.insert(
            principal.id,
            CachedEntry {
                principal: principal.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn remove(&self, id: PrincipalId) -> CacheResult<()> {
        self.entries.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::Role;

    fn ada() -> Principal {
        Principal::new(1, "ada", "ada@example.com", Role::new(1, "user", 1))
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = LocalPrincipalCache::new();
        cache.set(&ada(), Duration::from_secs(10)).await.unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(cache.get(1).await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get(1).await.unwrap().is_none());
        assert!(cache.is_empty());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
        assert!((stats.hit_rate() - 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_expired_counts_evictions() {
        let cache = LocalPrincipalCache::new();
        cache.set(&ada(), Duration::from_secs(1)).await.unwrap();
        let mut other = ada();
        other.id = 2;
        cache.set(&other, Duration::from_secs(60)).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.cleanup_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_sweeps_periodically() {
        let cache = Arc::new(LocalPrincipalCache::new());
        cache.set(&ada(), Duration::from_secs(1)).await.unwrap();
        let handle = cache.spawn_cleanup(Duration::from_secs(5));

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(cache.is_empty());

        drop(cache);
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn test_remove_drops_entry() {
        let cache = LocalPrincipalCache::new();
        cache.set(&ada(), Duration::from_secs(60)).await.unwrap();
        cache.remove(1).await.unwrap();
        assert!(cache.get(1).await.unwrap().is_none());
    }
}
