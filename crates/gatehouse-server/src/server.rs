use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{FromRef, Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get},
};
use gatehouse_auth::extractors::{BasicAuth, BasicAuthState};
use gatehouse_auth::middleware::{BearerPrincipal, GateState, rate_limit};
use gatehouse_auth::{RequestGate, ResourceGuard};
use gatehouse_auth_postgres::PostgresStore;
use gatehouse_core::PrincipalId;
use gatehouse_storage::Store;
use serde_json::{Value, json};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::cache::{PrincipalCacheBackend, create_principal_cache};
use crate::config::{AppConfig, StorageBackend, StorageConfig};

/// Role required to drop another principal's cached copy.
const CACHE_ADMIN_ROLE: &str = "admin";

/// Interval between sweeps of the local principal cache.
const CACHE_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

// =============================================================================
// Application State
// =============================================================================

#[derive(Clone)]
pub struct AppState {
    pub gate: GateState,
    pub basic: BasicAuthState,
    pub cache: PrincipalCacheBackend,
}

impl AppState {
    /// Wires the request gate over `store` and `cache`.
    pub fn new(
        config: &AppConfig,
        store: &Store,
        cache: PrincipalCacheBackend,
    ) -> anyhow::Result<Self> {
        let gate = RequestGate::from_config(&config.gate, store, Some(cache.shared()))?;
        Ok(Self {
            gate: GateState::new(Arc::new(gate), config.server.request_timeout),
            basic: BasicAuthState::new(config.gate.basic.clone()),
            cache,
        })
    }

    pub fn gate(&self) -> &Arc<RequestGate> {
        &self.gate.gate
    }
}

impl FromRef<AppState> for GateState {
    fn from_ref(state: &AppState) -> Self {
        state.gate.clone()
    }
}

impl FromRef<AppState> for BasicAuthState {
    fn from_ref(state: &AppState) -> Self {
        state.basic.clone()
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn health(State(state): State<AppState>, BasicAuth { username }: BasicAuth) -> Json<Value> {
    tracing::debug!(%username, "health check");
    let cache = state.cache.health().await;
    let status = if cache["reachable"].as_bool().unwrap_or(false) {
        "ok"
    } else {
        "degraded"
    };
    Json(json!({
        "status": status,
        "cache": cache,
        "rate_limiter": {
            "enabled": state.gate().limiter().is_enabled(),
            "tracked_clients": state.gate().limiter().len(),
        },
    }))
}

async fn me(BearerPrincipal { principal, .. }: BearerPrincipal) -> Response {
    Json(principal.principal).into_response()
}

async fn invalidate_cached_principal(
    State(state): State<AppState>,
    Path(id): Path<PrincipalId>,
    BearerPrincipal { principal, context }: BearerPrincipal,
) -> Response {
    let guard = ResourceGuard::new(id, CACHE_ADMIN_ROLE);
    if let Err(rejection) = state.gate().authorize(&context, &principal, &guard).await {
        return rejection.into_response();
    }

    state.gate().resolver().invalidate(&context, id).await;
    StatusCode::NO_CONTENT.into_response()
}

pub fn build_app(state: AppState) -> Router {
    let request_timeout = state.gate.request_timeout;
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/me", get(me))
        .route("/v1/users/{id}/cache", delete(invalidate_cached_principal))
        // Middleware stack (order: trace -> timeout -> rate limit)
        .layer(middleware::from_fn_with_state(state.gate.clone(), rate_limit))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Server
// =============================================================================

pub struct GatehouseServer {
    addr: SocketAddr,
    app: Router,
}

pub struct ServerBuilder {
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    /// Connects storage and cache, then assembles the app.
    pub async fn build(self) -> anyhow::Result<GatehouseServer> {
        let store = create_store(&self.config.storage).await?;
        let cache = create_principal_cache(&self.config.redis).await;
        let state = AppState::new(&self.config, &store, cache)?;

        let rate_limit = &self.config.gate.rate_limit;
        if rate_limit.enabled {
            state.gate().limiter().spawn_sweeper(rate_limit.sweep_interval);
        }
        if let Some(local) = state.cache.local() {
            local.spawn_cleanup(CACHE_CLEANUP_INTERVAL);
        }

        tracing::info!(
            storage = ?self.config.storage.backend,
            cache = state.cache.mode(),
            rate_limit = rate_limit.enabled,
            "gate initialized"
        );

        Ok(GatehouseServer {
            addr: self.config.addr(),
            app: build_app(state),
        })
    }
}

impl GatehouseServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(
            listener,
            self.app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;
        Ok(())
    }
}

/// Opens the configured role and principal store.
pub async fn create_store(config: &StorageConfig) -> anyhow::Result<Store> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::info!("using in-memory store");
            Ok(Store::from_backend(gatehouse_db_memory::create_memory_store()))
        }
        StorageBackend::Postgres => {
            let store = PostgresStore::connect(&config.postgres).await?;
            tracing::info!("connected to PostgreSQL store");
            Ok(Store::from_backend(Arc::new(store)))
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
