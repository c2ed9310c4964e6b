//! Role lookups.

use async_trait::async_trait;
use gatehouse_core::Role;
use gatehouse_storage::{RoleStorage, StorageResult};
use sqlx_core::query_as::query_as;
use tracing::instrument;

use crate::{PostgresError, PostgresStore};

type RoleTuple = (i64, String, i32, Option<String>);

pub(crate) fn role_from_tuple(row: RoleTuple) -> Role {
    let (id, name, level, description) = row;
    Role::new(id, name, level).with_description(description.unwrap_or_default())
}

#[async_trait]
impl RoleStorage for PostgresStore {
    #[instrument(skip(self))]
    async fn find_by_name(&self, name: &str) -> StorageResult<Option<Role>> {
        let row: Option<RoleTuple> = query_as(
            r#"
            SELECT id, name, level, description
            FROM roles
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(self.pool())
        .await
        .map_err(PostgresError::from)?;

        Ok(row.map(role_from_tuple))
    }
}
