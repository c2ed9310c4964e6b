//! Principal lookups.

use async_trait::async_trait;
use gatehouse_core::{Principal, PrincipalId};
use gatehouse_storage::{PrincipalStorage, StorageResult};
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;
use tracing::instrument;

use crate::role::role_from_tuple;
use crate::{PostgresError, PostgresStore};

type PrincipalTuple = (
    i64,
    String,
    String,
    OffsetDateTime,
    bool,
    i64,
    String,
    i32,
    Option<String>,
);

fn principal_from_tuple(row: PrincipalTuple) -> Principal {
    let (id, username, email, created_at, is_active, role_id, name, level, description) = row;
    Principal::new(
        id,
        username,
        email,
        role_from_tuple((role_id, name, level, description)),
    )
    .with_active(is_active)
    .with_created_at(created_at)
}

#[async_trait]
impl PrincipalStorage for PostgresStore {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: PrincipalId) -> StorageResult<Option<Principal>> {
        let row: Option<PrincipalTuple> = query_as(
            r#"
            SELECT u.id, u.username, u.email, u.created_at, u.is_active,
                   r.id, r.name, r.level, r.description
            FROM users u
            JOIN roles r ON r.id = u.role_id
            WHERE u.id = $1
              AND u.is_active = true
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(PostgresError::from)?;

        Ok(row.map(principal_from_tuple))
    }
}
