//! # gatehouse-storage
//!
//! Narrow persistence and cache interfaces consumed by the request gate.
//!
//! The gate never talks to a database directly. It reads roles through
//! [`RoleStorage`], principals through [`PrincipalStorage`], and accelerates
//! principal reads through a [`PrincipalCache`]. Backends live in separate
//! crates (`gatehouse-db-memory`, `gatehouse-auth-postgres`) and in the server
//! (`LocalPrincipalCache`, `RedisPrincipalCache`).
//!
//! ## Example
//!
//! ```ignore
//! use gatehouse_storage::{RoleStorage, StorageResult};
//!
//! async fn level_of(roles: &dyn RoleStorage, name: &str) -> StorageResult<Option<i32>> {
//!     Ok(roles.find_by_name(name).await?.map(|role| role.level))
//! }
//! ```

mod error;
mod traits;

pub use error::{CacheError, ErrorCategory, StorageError};
pub use traits::{PrincipalCache, PrincipalStorage, RoleStorage, Store, principal_cache_key};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a cache result.
pub type CacheResult<T> = Result<T, CacheError>;
