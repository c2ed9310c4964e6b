//! HTTP server that runs every request through the gatehouse gate.

pub mod cache;
pub mod config;
pub mod observability;
pub mod server;

pub use cache::{
    LocalPrincipalCache, PrincipalCacheBackend, RedisPrincipalCache, create_principal_cache,
};
pub use config::{AppConfig, RedisConfig};
pub use server::{AppState, GatehouseServer, ServerBuilder, build_app, create_store};
