//! PostgreSQL storage backend for gatehouse.
//!
//! Reads roles and principals from two tables:
//!
//! ```text
//! roles (id BIGSERIAL, name TEXT UNIQUE, level INT, description TEXT)
//! users (id BIGSERIAL, username TEXT, email TEXT, created_at TIMESTAMPTZ,
//!        is_active BOOLEAN, role_id BIGINT REFERENCES roles(id))
//! ```
//!
//! Schema management is out of scope. [`PostgresStore::connect`] refuses a
//! database that lacks any of the columns above.
//!
//! # Example
//!
//! ```ignore
//! use gatehouse_auth_postgres::{PostgresConfig, PostgresStore};
//!
//! let store = PostgresStore::connect(&PostgresConfig::default()).await?;
//! let admin = store.find_by_name("admin").await?;
//! ```

pub mod config;
pub mod pool;
mod principal;
mod role;

use gatehouse_storage::StorageError;
use sqlx_core::pool::Pool;
use sqlx_postgres::Postgres;

pub use config::PostgresConfig;
pub use pool::{REQUIRED_COLUMNS, create_pool, verify_schema};

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised by the PostgreSQL backend.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::Error),

    /// The database lacks tables or columns the store reads.
    #[error("Schema mismatch: {0}")]
    Schema(String),
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Database(sqlx_core::Error::ColumnDecode { index, source }) => {
                StorageError::serialization(format!("column {index}: {source}"))
            }
            PostgresError::Database(e) => StorageError::connection_error(e.to_string()),
            PostgresError::Schema(message) => StorageError::internal(message),
        }
    }
}

/// Result type for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;

// =============================================================================
// Store
// =============================================================================

/// Role and principal storage over a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wraps an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a pool from configuration and checks the schema.
    ///
    /// # Errors
    ///
    /// Returns `Database` if the pool cannot connect and `Schema` if a
    /// required column is missing.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let pool = create_pool(config).await?;
        verify_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
