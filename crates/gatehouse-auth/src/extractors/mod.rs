//! Axum extractors for operational endpoints.
//!
//! - [`BasicAuth`]: HTTP Basic credentials checked against configuration
//!
//! ```ignore
//! use gatehouse_auth::extractors::BasicAuth;
//!
//! async fn health(_auth: BasicAuth) -> &'static str {
//!     "ok"
//! }
//! ```

mod basic_auth;

pub use basic_auth::{BasicAuth, BasicAuthError, BasicAuthState};
