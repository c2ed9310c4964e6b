//! Bearer token handling.

pub mod jwt;

pub use jwt::{TokenAuthenticator, TokenClaims, parse_bearer};
