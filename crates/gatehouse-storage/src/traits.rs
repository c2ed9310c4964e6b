//! Storage and cache traits.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gatehouse_core::{Principal, PrincipalId, Role};

use crate::{CacheResult, StorageResult};

/// Read access to role reference data.
///
/// # Example
///
/// ```ignore
/// let admin = roles.find_by_name("admin").await?;
/// ```
#[async_trait]
pub trait RoleStorage: Send + Sync {
    /// Find a role by its unique name.
    ///
    /// Returns `None` if no role has that name.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_name(&self, name: &str) -> StorageResult<Option<Role>>;
}

/// Read access to principals.
#[async_trait]
pub trait PrincipalStorage: Send + Sync {
    /// Find an active principal by id, with its role resolved.
    ///
    /// Returns `None` if the principal does not exist or is inactive.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, id: PrincipalId) -> StorageResult<Option<Principal>>;
}

/// Cache of principals keyed by id.
///
/// A miss is `Ok(None)`, never an error. Expired entries are misses.
#[async_trait]
pub trait PrincipalCache: Send + Sync {
    /// Get a cached principal.
    async fn get(&self, id: PrincipalId) -> CacheResult<Option<Principal>>;

    /// Store a principal for `ttl`.
    async fn set(&self, principal: &Principal, ttl: Duration) -> CacheResult<()>;

    /// Remove a cached principal. Removing an absent key succeeds.
    async fn remove(&self, id: PrincipalId) -> CacheResult<()>;
}

/// Cache key under which a principal is stored.
#[must_use]
pub fn principal_cache_key(id: PrincipalId) -> String {
    format!("principal-{id}")
}

/// The persistence interfaces a gate needs, grouped for wiring.
#[derive(Clone)]
pub struct Store {
    pub roles: Arc<dyn RoleStorage>,
    pub principals: Arc<dyn PrincipalStorage>,
}

impl Store {
    #[must_use]
    pub fn new(roles: Arc<dyn RoleStorage>, principals: Arc<dyn PrincipalStorage>) -> Self {
        Self { roles, principals }
    }

    /// Builds a store from a single backend implementing both interfaces.
    #[must_use]
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: RoleStorage + PrincipalStorage + 'static,
    {
        Self {
            roles: backend.clone(),
            principals: backend,
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}
