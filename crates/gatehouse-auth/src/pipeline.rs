//! Request gate pipeline.
//!
//! Composes the stages every request passes through:
//!
//! ```text
//! rate limit ──429──► rejected
//!     │
//! authenticate (bearer token) ──401──► rejected
//!     │
//! resolve principal ──401──► rejected
//!     │
//! authorize (ownership / role precedence) ──403──► rejected
//!     │
//! admitted
//! ```
//!
//! Each stage short-circuits. Rejections carry only kind-level information;
//! the specific [`AuthError`] is logged and then dropped.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use gatehouse_core::{Principal, PrincipalId, RequestContext};
use gatehouse_storage::{PrincipalCache, Store};

use crate::config::GateConfig;
use crate::error::{AuthError, AuthResult, ErrorCategory};
use crate::policy::OwnershipPolicy;
use crate::ratelimit::FixedWindowRateLimiter;
use crate::resolver::PrincipalResolver;
use crate::token::{TokenAuthenticator, TokenClaims, parse_bearer};

// =============================================================================
// Request Types
// =============================================================================

/// Identity established for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedPrincipal {
    pub principal: Principal,
    pub claims: TokenClaims,
}

impl AuthenticatedPrincipal {
    #[must_use]
    pub fn id(&self) -> PrincipalId {
        self.principal.id
    }
}

/// The resource a request targets, as seen by the authorization stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGuard {
    pub owner_id: PrincipalId,
    pub required_role: String,
}

impl ResourceGuard {
    #[must_use]
    pub fn new(owner_id: PrincipalId, required_role: impl Into<String>) -> Self {
        Self {
            owner_id,
            required_role: required_role.into(),
        }
    }
}

/// Everything the gate needs to decide on a request.
#[derive(Debug, Clone, Copy)]
pub struct GateRequest<'a> {
    /// Rate-limit key, usually the client address.
    pub client_key: &'a str,
    /// Raw `Authorization` header value.
    pub authorization: Option<&'a str>,
    /// Resource to authorize against. `None` skips authorization.
    pub guard: Option<&'a ResourceGuard>,
}

// =============================================================================
// Rejections
// =============================================================================

/// Which `WWW-Authenticate` challenge a 401 should carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Challenge {
    /// No credentials were presented.
    MissingCredentials,
    /// Credentials were presented but rejected.
    InvalidToken,
}

/// Kind-level reason a request was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GateRejection {
    #[error("rate limited")]
    RateLimited { retry_after: Duration },

    #[error("unauthorized")]
    Unauthorized { challenge: Challenge },

    #[error("forbidden")]
    Forbidden,

    #[error("internal error")]
    Internal,
}

impl GateRejection {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The external error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::Internal => "internal_error",
        }
    }

    /// `Retry-After` in whole seconds, rounded up.
    #[must_use]
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after } => {
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                Some(secs.max(1))
            }
            _ => None,
        }
    }
}

impl From<&AuthError> for GateRejection {
    fn from(err: &AuthError) -> Self {
        match err {
            AuthError::RateLimitExceeded { retry_after } => Self::RateLimited {
                retry_after: *retry_after,
            },
            AuthError::MissingCredentials => Self::Unauthorized {
                challenge: Challenge::MissingCredentials,
            },
            _ => match err.category() {
                ErrorCategory::Authentication | ErrorCategory::Token => Self::Unauthorized {
                    challenge: Challenge::InvalidToken,
                },
                ErrorCategory::Authorization => Self::Forbidden,
                ErrorCategory::RateLimit
                | ErrorCategory::Infrastructure
                | ErrorCategory::Configuration
                | ErrorCategory::Internal => Self::Internal,
            },
        }
    }
}

impl From<AuthError> for GateRejection {
    fn from(err: AuthError) -> Self {
        Self::from(&err)
    }
}

/// Logs the specific error and collapses it to a rejection.
fn reject(ctx: &RequestContext, stage: &'static str, err: AuthError) -> GateRejection {
    let category = err.category();
    if err.is_server_error() {
        tracing::error!(
            request_id = ctx.request_id(),
            stage,
            category = %category,
            error = %err,
            "request gate failed"
        );
    } else {
        tracing::debug!(
            request_id = ctx.request_id(),
            stage,
            category = %category,
            error = %err,
            "request rejected"
        );
    }
    GateRejection::from(err)
}

// =============================================================================
// Request Gate
// =============================================================================

/// The composed rate-limit, authentication and authorization pipeline.
#[derive(Clone, Debug)]
pub struct RequestGate {
    limiter: Arc<FixedWindowRateLimiter>,
    authenticator: Arc<TokenAuthenticator>,
    resolver: PrincipalResolver,
    policy: OwnershipPolicy,
}

impl RequestGate {
    #[must_use]
    pub fn new(
        limiter: Arc<FixedWindowRateLimiter>,
        authenticator: Arc<TokenAuthenticator>,
        resolver: PrincipalResolver,
        policy: OwnershipPolicy,
    ) -> Self {
        Self {
            limiter,
            authenticator,
            resolver,
            policy,
        }
    }

    /// Builds a gate from configuration and storage.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the configuration is invalid.
    pub fn from_config(
        config: &GateConfig,
        store: &Store,
        cache: Option<Arc<dyn PrincipalCache>>,
    ) -> AuthResult<Self> {
        config
            .validate()
            .map_err(|e| AuthError::configuration(e.to_string()))?;

        let limiter = Arc::new(FixedWindowRateLimiter::from_config(&config.rate_limit));
        let authenticator = Arc::new(TokenAuthenticator::from_config(&config.token)?);
        let resolver = PrincipalResolver::from_config(
            store.principals.clone(),
            cache,
            &config.cache,
            &config.store,
        );
        let policy = OwnershipPolicy::new(store.roles.clone())
            .with_call_timeout(config.store.call_timeout);

        Ok(Self::new(limiter, authenticator, resolver, policy))
    }

    #[must_use]
    pub fn limiter(&self) -> &Arc<FixedWindowRateLimiter> {
        &self.limiter
    }

    #[must_use]
    pub fn authenticator(&self) -> &TokenAuthenticator {
        &self.authenticator
    }

    #[must_use]
    pub fn resolver(&self) -> &PrincipalResolver {
        &self.resolver
    }

    #[must_use]
    pub fn policy(&self) -> &OwnershipPolicy {
        &self.policy
    }

    /// Rate-limit stage.
    ///
    /// # Errors
    ///
    /// Returns `GateRejection::RateLimited` when the key's budget is spent.
    pub fn admit(&self, client_key: &str) -> Result<(), GateRejection> {
        let decision = self.limiter.allow(client_key);
        if decision.allowed {
            return Ok(());
        }

        tracing::warn!(
            client = client_key,
            retry_after_ms = u64::try_from(decision.retry_after.as_millis()).unwrap_or(u64::MAX),
            "rate limit exceeded"
        );
        Err(GateRejection::RateLimited {
            retry_after: decision.retry_after,
        })
    }

    /// Authentication and principal resolution stages.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for missing or invalid credentials and unknown
    /// principals, and `Internal` when the store fails.
    pub async fn authenticate(
        &self,
        ctx: &RequestContext,
        authorization: Option<&str>,
    ) -> Result<AuthenticatedPrincipal, GateRejection> {
        let claims = parse_bearer(authorization)
            .and_then(|token| self.authenticator.validate_token(token))
            .map_err(|e| reject(ctx, "authenticate", e))?;

        let principal = self
            .resolver
            .get(ctx, claims.sub)
            .await
            .map_err(|e| reject(ctx, "resolve", e))?;

        tracing::debug!(
            request_id = ctx.request_id(),
            principal_id = principal.id,
            role = %principal.role.name,
            "request authenticated"
        );
        Ok(AuthenticatedPrincipal { principal, claims })
    }

    /// Authorization stage.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` when the principal neither owns the resource nor
    /// holds a sufficient role, and `Internal` if the role lookup fails.
    pub async fn authorize(
        &self,
        ctx: &RequestContext,
        principal: &AuthenticatedPrincipal,
        guard: &ResourceGuard,
    ) -> Result<(), GateRejection> {
        let allowed = self
            .policy
            .check_ownership(
                ctx,
                &principal.principal,
                guard.owner_id,
                &guard.required_role,
            )
            .await
            .map_err(|e| reject(ctx, "authorize", e))?;

        if allowed {
            Ok(())
        } else {
            Err(reject(
                ctx,
                "authorize",
                AuthError::forbidden(format!(
                    "principal {} may not act on resource owned by {}",
                    principal.id(),
                    guard.owner_id
                )),
            ))
        }
    }

    /// Runs every stage in order, stopping at the first rejection.
    ///
    /// # Errors
    ///
    /// Returns the rejection of the first stage that refuses the request.
    pub async fn evaluate(
        &self,
        ctx: &RequestContext,
        request: GateRequest<'_>,
    ) -> Result<AuthenticatedPrincipal, GateRejection> {
        self.admit(request.client_key)?;
        let principal = self.authenticate(ctx, request.authorization).await?;
        if let Some(guard) = request.guard {
            self.authorize(ctx, &principal, guard).await?;
        }
        Ok(principal)
    }
}
