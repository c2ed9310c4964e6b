//! In-memory role and principal storage for gatehouse.
//!
//! Backed by [`dashmap`] so reads never contend across keys. Intended for
//! development, tests, and single-node deployments without a database.
//!
//! # Example
//!
//! ```ignore
//! use gatehouse_db_memory::InMemoryStore;
//! use gatehouse_storage::RoleStorage;
//!
//! let store = InMemoryStore::with_default_roles();
//! let admin = store.find_by_name("admin").await?;
//! ```

mod store;

pub use store::{DEFAULT_ROLES, InMemoryStore};

/// Creates a shareable in-memory store seeded with the default role ladder.
#[must_use]
pub fn create_memory_store() -> std::sync::Arc<InMemoryStore> {
    std::sync::Arc::new(InMemoryStore::with_default_roles())
}
