//! Bearer principal extractor.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use gatehouse_auth::middleware::{BearerPrincipal, GateState};
//!
//! async fn whoami(BearerPrincipal { principal, .. }: BearerPrincipal) -> String {
//!     principal.principal.username
//! }
//!
//! let app = Router::new()
//!     .route("/v1/me", get(whoami))
//!     .with_state(gate_state);
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use gatehouse_core::RequestContext;

use crate::pipeline::{AuthenticatedPrincipal, GateRejection, RequestGate};

const X_REQUEST_ID: &str = "x-request-id";

// =============================================================================
// Gate State
// =============================================================================

/// Shared state for gate middleware and extractors.
#[derive(Clone, Debug)]
pub struct GateState {
    pub gate: Arc<RequestGate>,

    /// Deadline applied to every dependency call made for a request.
    pub request_timeout: Duration,
}

impl GateState {
    #[must_use]
    pub fn new(gate: Arc<RequestGate>, request_timeout: Duration) -> Self {
        Self {
            gate,
            request_timeout,
        }
    }

    /// Creates the request context for an incoming request.
    #[must_use]
    pub fn request_context(&self, parts: &Parts) -> RequestContext {
        let ctx = RequestContext::with_timeout(self.request_timeout);
        match parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
        {
            Some(request_id) => ctx.with_request_id(request_id),
            None => ctx,
        }
    }
}

// =============================================================================
// Bearer Principal Extractor
// =============================================================================

/// An authenticated request.
///
/// Extraction validates the bearer token and resolves its principal. The
/// request context is handed to the handler so later stages share the same
/// deadline.
#[derive(Debug, Clone)]
pub struct BearerPrincipal {
    pub principal: AuthenticatedPrincipal,
    pub context: RequestContext,
}

impl<S> FromRequestParts<S> for BearerPrincipal
where
    S: Send + Sync,
    GateState: FromRef<S>,
{
    type Rejection = GateRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = GateState::from_ref(state);
        let context = state.request_context(parts);

        let authorization = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let principal = state.gate.authenticate(&context, authorization).await?;

        Ok(BearerPrincipal { principal, context })
    }
}
