use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use gatehouse_core::{Principal, PrincipalId, Role};
use gatehouse_storage::{PrincipalStorage, RoleStorage, StorageResult};

/// Default role ladder as `(name, level, description)`.
pub const DEFAULT_ROLES: [(&str, i32, &str); 3] = [
    ("user", 1, "A user can create posts and comments"),
    ("moderator", 2, "A moderator can update other users posts"),
    ("admin", 3, "An admin can update and delete other users posts"),
];

/// Role and principal storage held in concurrent maps.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    roles: DashMap<String, Role>,
    principals: DashMap<PrincipalId, Principal>,
    principal_lookups: AtomicU64,
    role_lookups: AtomicU64,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with [`DEFAULT_ROLES`].
    #[must_use]
    pub fn with_default_roles() -> Self {
        let store = Self::new();
        for (id, (name, level, description)) in (1..).zip(DEFAULT_ROLES) {
            store.insert_role(Role::new(id, name, level).with_description(description));
        }
        store
    }

    /// Inserts or replaces a role, keyed by name.
    pub fn insert_role(&self, role: Role) {
        self.roles.insert(role.name.clone(), role);
    }

    /// Inserts or replaces a principal, keyed by id.
    pub fn insert_principal(&self, principal: Principal) {
        self.principals.insert(principal.id, principal);
    }

    /// Removes a principal. Returns the removed value, if any.
    pub fn remove_principal(&self, id: PrincipalId) -> Option<Principal> {
        self.principals.remove(&id).map(|(_, principal)| principal)
    }

    /// Returns a role by name without counting the lookup.
    #[must_use]
    pub fn role(&self, name: &str) -> Option<Role> {
        self.roles.get(name).map(|role| role.clone())
    }

    /// Number of `find_by_id` calls served.
    #[must_use]
    pub fn principal_lookups(&self) -> u64 {
        self.principal_lookups.load(Ordering::Relaxed)
    }

    /// Number of `find_by_name` calls served.
    #[must_use]
    pub fn role_lookups(&self) -> u64 {
        self.role_lookups.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RoleStorage for InMemoryStore {
    async fn find_by_name(&self, name: &str) -> StorageResult<Option<Role>> {
        self.role_lookups.fetch_add(1, Ordering::Relaxed);
        Ok(self.role(name))
    }
}

#[async_trait]
impl PrincipalStorage for InMemoryStore {
    async fn find_by_id(&self, id: PrincipalId) -> StorageResult<Option<Principal>> {
        self.principal_lookups.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .principals
            .get(&id)
            .filter(|principal| principal.is_active)
            .map(|principal| principal.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_roles_are_ordered() {
        let store = InMemoryStore::with_default_roles();

        let user = store.find_by_name("user").await.unwrap().unwrap();
        let moderator = store.find_by_name("moderator").await.unwrap().unwrap();
        let admin = store.find_by_name("admin").await.unwrap().unwrap();

        assert!(user.level < moderator.level);
        assert!(moderator.level < admin.level);
        assert_eq!(store.role_lookups(), 3);
    }

    #[tokio::test]
    async fn test_unknown_role_is_none() {
        let store = InMemoryStore::with_default_roles();
        assert!(store.find_by_name("superuser").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_inactive_principal_is_hidden() {
        let store = InMemoryStore::with_default_roles();
        let role = store.role("user").unwrap();
        store.insert_principal(Principal::new(1, "ada", "ada@example.com", role.clone()));
        store.insert_principal(
            Principal::new(2, "bob", "bob@example.com", role).with_active(false),
        );

        assert!(store.find_by_id(1).await.unwrap().is_some());
        assert!(store.find_by_id(2).await.unwrap().is_none());
        assert!(store.find_by_id(3).await.unwrap().is_none());
        assert_eq!(store.principal_lookups(), 3);
    }

    #[tokio::test]
    async fn test_remove_principal() {
        let store = InMemoryStore::with_default_roles();
        let role = store.role("admin").unwrap();
        store.insert_principal(Principal::new(9, "root", "root@example.com", role));

        assert!(store.remove_principal(9).is_some());
        assert!(store.find_by_id(9).await.unwrap().is_none());
    }
}
