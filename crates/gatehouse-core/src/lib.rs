//! Core domain types shared by every gatehouse crate.
//!
//! - [`Principal`] and [`Role`]: the authenticated identity and its privilege level.
//! - [`RequestContext`]: request-scoped deadline and cancellation carrier that bounds
//!   every cache and store call made on behalf of a request.

pub mod context;
pub mod principal;

pub use context::{ContextError, RequestContext};
pub use principal::{Principal, PrincipalId, Role};
