//! HTTP middleware for the request gate.
//!
//! - [`rate_limit`]: per-client fixed-window limiting, 429 with `Retry-After`
//! - [`BearerPrincipal`]: bearer token authentication and principal resolution
//! - `IntoResponse` for [`GateRejection`](crate::pipeline::GateRejection) with
//!   kind-level JSON bodies

pub mod auth;
pub mod error;
pub mod rate_limit;

pub use auth::{BearerPrincipal, GateState};
pub use rate_limit::{client_key, rate_limit};
