//! # gatehouse-auth
//!
//! Request gating for HTTP services: every request is rate limited, then
//! authenticated with an HS256 bearer token, then authorized by ownership or
//! role precedence.
//!
//! ## Modules
//!
//! - [`ratelimit`]: fixed-window per-client rate limiter
//! - [`token`]: HS256 token issuance and validation
//! - [`resolver`]: cache-aside principal lookup
//! - [`policy`]: ownership and role-precedence authorization
//! - [`pipeline`]: the composed [`RequestGate`]
//! - [`middleware`] and [`extractors`]: axum integration
//! - [`config`]: configuration types
//! - [`error`]: the [`AuthError`] taxonomy
//!
//! ## Example
//!
//! ```ignore
//! use gatehouse_auth::prelude::*;
//!
//! let gate = RequestGate::from_config(&config, &store, Some(cache))?;
//! let ctx = RequestContext::with_timeout(Duration::from_secs(60));
//! let principal = gate
//!     .evaluate(&ctx, GateRequest {
//!         client_key: "203.0.113.9",
//!         authorization: Some("Bearer eyJ..."),
//!         guard: Some(&ResourceGuard::new(post.user_id, "moderator")),
//!     })
//!     .await?;
//! ```

pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod pipeline;
pub mod policy;
pub mod ratelimit;
pub mod resolver;
pub mod token;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{ConfigError, GateConfig};
pub use error::{AuthError, AuthResult, ErrorCategory};
pub use pipeline::{
    AuthenticatedPrincipal, Challenge, GateRejection, GateRequest, RequestGate, ResourceGuard,
};
pub use policy::OwnershipPolicy;
pub use ratelimit::{FixedWindowRateLimiter, RateDecision};
pub use resolver::PrincipalResolver;
pub use token::{TokenAuthenticator, TokenClaims};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::GateConfig;
    pub use crate::error::{AuthError, AuthResult};
    pub use crate::middleware::{BearerPrincipal, GateState};
    pub use crate::pipeline::{
        AuthenticatedPrincipal, GateRejection, GateRequest, RequestGate, ResourceGuard,
    };
    pub use gatehouse_core::{Principal, RequestContext, Role};
}
