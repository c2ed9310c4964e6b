//! Role-precedence authorization with ownership override.

use std::sync::Arc;
use std::time::Duration;

use gatehouse_core::{Principal, PrincipalId, RequestContext};
use gatehouse_storage::RoleStorage;

use crate::config::StoreConfig;
use crate::error::{AuthError, AuthResult};

/// Decides whether a principal may act on a resource.
#[derive(Clone)]
pub struct OwnershipPolicy {
    roles: Arc<dyn RoleStorage>,
    call_timeout: Duration,
}

impl OwnershipPolicy {
    #[must_use]
    pub fn new(roles: Arc<dyn RoleStorage>) -> Self {
        Self {
            roles,
            call_timeout: StoreConfig::default().call_timeout,
        }
    }

    #[must_use]
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Returns `true` if `principal` owns the resource or holds a role at
    /// least as privileged as `required_role`.
    ///
    /// Ownership is checked first and short-circuits without touching role
    /// storage.
    ///
    /// # Errors
    ///
    /// - `RoleNotFound` if `required_role` is not defined
    /// - `StoreUnavailable` if role storage fails or times out
    pub async fn check_ownership(
        &self,
        ctx: &RequestContext,
        principal: &Principal,
        owner_id: PrincipalId,
        required_role: &str,
    ) -> AuthResult<bool> {
        if principal.owns(owner_id) {
            tracing::debug!(principal_id = principal.id, "access granted to owner");
            return Ok(true);
        }

        self.check_role_precedence(ctx, principal, required_role)
            .await
    }

    /// Returns `true` if the principal's role level is at least that of
    /// `required_role`.
    ///
    /// # Errors
    ///
    /// - `RoleNotFound` if `required_role` is not defined
    /// - `StoreUnavailable` if role storage fails or times out
    pub async fn check_role_precedence(
        &self,
        ctx: &RequestContext,
        principal: &Principal,
        required_role: &str,
    ) -> AuthResult<bool> {
        let required = ctx
            .run(Some(self.call_timeout), self.roles.find_by_name(required_role))
            .await??
            .ok_or_else(|| AuthError::role_not_found(required_role))?;

        let allowed = principal.role.satisfies(&required);
        tracing::debug!(
            principal_id = principal.id,
            principal_level = principal.role.level,
            required_role = %required.name,
            required_level = required.level,
            allowed,
            "role precedence checked"
        );
        Ok(allowed)
    }
}

impl std::fmt::Debug for OwnershipPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnershipPolicy")
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}
