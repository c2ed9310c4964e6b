//! Shared test doubles.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use gatehouse_core::{Principal, PrincipalId, Role};
use gatehouse_db_memory::InMemoryStore;
use gatehouse_storage::{
    CacheError, CacheResult, PrincipalCache, PrincipalStorage, RoleStorage, StorageError,
    StorageResult,
};

/// Seeded store: 1 = ada (user), 2 = mo (moderator), 3 = root (admin).
pub fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::with_default_roles());
    for id in 1..=3 {
        store.insert_principal(principal(id));
    }
    store
}

/// The fixture principal for `id` in [`seeded_store`].
pub fn principal(id: PrincipalId) -> Principal {
    let (username, role) = match id {
        1 => ("ada", Role::new(1, "user", 1)),
        2 => ("mo", Role::new(2, "moderator", 2)),
        _ => ("root", Role::new(3, "admin", 3)),
    };
    Principal::new(id, username, format!("{username}@example.com"), role)
        .with_created_at(time::macros::datetime!(2024-01-01 00:00 UTC))
}

#[derive(Default)]
pub struct MapCache {
    entries: DashMap<PrincipalId, Principal>,
    gets: AtomicU64,
}

impl MapCache {
    pub fn contains(&self, id: PrincipalId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn gets(&self) -> u64 {
        self.gets.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PrincipalCache for MapCache {
    async fn get(&self, id: PrincipalId) -> CacheResult<Option<Principal>> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        Ok(self.entries.get(&id).map(|p| p.clone()))
    }

    async fn set(&self, principal: &Principal, _ttl: Duration) -> CacheResult<()> {
        self.entries.insert(principal.id, principal.clone());
        Ok(())
    }

    async fn remove(&self, id: PrincipalId) -> CacheResult<()> {
        self.entries.remove(&id);
        Ok(())
    }
}

pub struct FailingCache;

#[async_trait]
impl PrincipalCache for FailingCache {
    async fn get(&self, _id: PrincipalId) -> CacheResult<Option<Principal>> {
        Err(CacheError::connection("connection refused"))
    }

    async fn set(&self, _principal: &Principal, _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::connection("connection refused"))
    }

    async fn remove(&self, _id: PrincipalId) -> CacheResult<()> {
        Err(CacheError::connection("connection refused"))
    }
}

/// A cache whose calls never complete.
pub struct StalledCache;

#[async_trait]
impl PrincipalCache for StalledCache {
    async fn get(&self, _id: PrincipalId) -> CacheResult<Option<Principal>> {
        std::future::pending().await
    }

    async fn set(&self, _principal: &Principal, _ttl: Duration) -> CacheResult<()> {
        std::future::pending().await
    }

    async fn remove(&self, _id: PrincipalId) -> CacheResult<()> {
        std::future::pending().await
    }
}

pub struct FailingStore;

#[async_trait]
impl RoleStorage for FailingStore {
    async fn find_by_name(&self, _name: &str) -> StorageResult<Option<Role>> {
        Err(StorageError::connection_error("database down"))
    }
}

#[async_trait]
impl PrincipalStorage for FailingStore {
    async fn find_by_id(&self, _id: PrincipalId) -> StorageResult<Option<Principal>> {
        Err(StorageError::connection_error("database down"))
    }
}

/// A store whose calls never complete.
pub struct StalledStore;

#[async_trait]
impl RoleStorage for StalledStore {
    async fn find_by_name(&self, _name: &str) -> StorageResult<Option<Role>> {
        std::future::pending().await
    }
}

#[async_trait]
impl PrincipalStorage for StalledStore {
    async fn find_by_id(&self, _id: PrincipalId) -> StorageResult<Option<Principal>> {
        std::future::pending().await
    }
}
