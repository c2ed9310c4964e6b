//! Pool construction and start-up schema check.

use std::time::Duration;

use sqlx_core::pool::PoolOptions;
use sqlx_core::query_as::query_as;
use sqlx_postgres::{PgConnectOptions, Postgres};
use tracing::{debug, info, instrument};

use crate::config::PostgresConfig;
use crate::{PgPool, PostgresError, Result};

/// Columns the role and principal queries read, per table.
pub const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("roles", &["id", "name", "level", "description"]),
    (
        "users",
        &["id", "username", "email", "created_at", "is_active", "role_id"],
    ),
];

/// Pool options derived from configuration.
pub fn pool_options(config: &PostgresConfig) -> PoolOptions<Postgres> {
    let min_connections = config
        .min_connections
        .unwrap_or(config.pool_size / 4)
        .clamp(1, config.pool_size.max(1));

    PoolOptions::new()
        .max_connections(config.pool_size)
        .min_connections(min_connections)
        .acquire_timeout(Duration::from_millis(config.connect_timeout_ms))
        .idle_timeout(config.idle_timeout_ms.map(Duration::from_millis))
        .max_lifetime(config.max_lifetime_secs.map(Duration::from_secs))
}

/// Opens a pool for `config.url`. Only host, port and database are logged.
#[instrument(skip(config), fields(pool_size = config.pool_size))]
pub async fn create_pool(config: &PostgresConfig) -> Result<PgPool> {
    let connect: PgConnectOptions = config.url.parse()?;
    info!(
        host = connect.get_host(),
        port = connect.get_port(),
        database = connect.get_database().unwrap_or_default(),
        "Opening PostgreSQL pool"
    );

    Ok(pool_options(config).connect_with(connect).await?)
}

/// Fails unless every column in [`REQUIRED_COLUMNS`] exists in the current
/// schema, so a server pointed at the wrong database stops at start-up.
#[instrument(skip(pool))]
pub async fn verify_schema(pool: &PgPool) -> Result<()> {
    let tables: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .map(|(table, _)| (*table).to_string())
        .collect();

    let present: Vec<(String, String)> = query_as(
        r#"
        SELECT table_name::text, column_name::text
        FROM information_schema.columns
        WHERE table_schema = current_schema()
          AND table_name = ANY($1)
        "#,
    )
    .bind(tables)
    .fetch_all(pool)
    .await?;

    let missing = missing_columns(&present);
    if !missing.is_empty() {
        return Err(PostgresError::Schema(format!(
            "missing columns: {}",
            missing.join(", ")
        )));
    }

    debug!("PostgreSQL schema verified");
    Ok(())
}

/// `table.column` names from [`REQUIRED_COLUMNS`] absent from `present`.
fn missing_columns(present: &[(String, String)]) -> Vec<String> {
    REQUIRED_COLUMNS
        .iter()
        .flat_map(|(table, columns)| columns.iter().map(move |column| (*table, *column)))
        .filter(|(table, column)| {
            !present
                .iter()
                .any(|(t, c)| t.as_str() == *table && c.as_str() == *column)
        })
        .map(|(table, column)| format!("{table}.{column}"))
        .collect()
}
