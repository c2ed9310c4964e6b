//! Principal and role types.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Identifier of a principal. Matches the `sub` claim of issued tokens.
pub type PrincipalId = i64;

/// A named privilege level.
///
/// Levels are totally ordered: a higher level is strictly more privileged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub level: i32,
    #[serde(default)]
    pub description: String,
}

impl Role {
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>, level: i32) -> Self {
        Self {
            id,
            name: name.into(),
            level,
            description: String::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Returns true if this role is at least as privileged as `required`.
    #[must_use]
    pub fn satisfies(&self, required: &Role) -> bool {
        self.level >= required.level
    }
}

/// An authenticated identity together with its resolved role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Principal {
    /// Creates an active principal created now.
    #[must_use]
    pub fn new(
        id: PrincipalId,
        username: impl Into<String>,
        email: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
            role,
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[must_use]
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    #[must_use]
    pub fn with_created_at(mut self, created_at: OffsetDateTime) -> Self {
        self.created_at = created_at;
        self
    }

    /// Returns true if this principal owns a resource with the given owner id.
    #[must_use]
    pub fn owns(&self, owner_id: PrincipalId) -> bool {
        self.id == owner_id
    }
}
