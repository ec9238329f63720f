//! API Router and Application State
//!
//! Central routing configuration and shared state.

use axum::{
    extract::State, middleware::from_fn_with_state, routing::get, Json, Router,
};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{
    auth::{self, Principal},
    churches,
    config::Config,
    error::AccessError,
    events::{self, LedgerSettings, ReservationLedger},
    members,
    permissions::Role,
    tenancy::{ScopedQueryGuard, TenantScope},
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,
    /// Server configuration
    pub config: Arc<Config>,
    /// Tenant scoping for reads and writes
    pub guard: ScopedQueryGuard<PgPool>,
    /// Event reservations
    pub ledger: ReservationLedger,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(db: PgPool, config: Config) -> Self {
        let ledger = ReservationLedger::new(db.clone(), LedgerSettings::from_config(&config));
        Self {
            guard: ScopedQueryGuard::new(db.clone()),
            ledger,
            db,
            config: Arc::new(config),
        }
    }
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected_routes = Router::new()
        .route("/api/me", get(me))
        .nest("/api/local-churches", churches::router())
        .nest("/api/members", members::router())
        .nest("/api/events", events::router())
        .nest("/api/rsvps", events::rsvp_router())
        .layer(from_fn_with_state(state.clone(), auth::require_auth));

    Router::new()
        // Health check
        .route("/health", get(health_check))
        .merge(protected_routes)
        // Middleware
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    /// Service status
    status: &'static str,
    /// Whether the database answered a ping
    database: bool,
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = sqlx::query("SELECT 1").execute(&state.db).await.is_ok();
    Json(HealthResponse {
        status: "ok",
        database,
    })
}

/// Response for `GET /api/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub principal: Principal,
    /// Default route for the principal's role
    pub landing_path: &'static str,
    pub accessible_tenants: TenantScope,
    /// Whether the principal sees every local church
    pub organization_wide: bool,
}

/// The authenticated principal, where to land, and what they can see.
#[tracing::instrument(skip(state))]
async fn me(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<MeResponse>, AccessError> {
    let accessible_tenants = state.guard.accessible_tenants(&principal).await?;

    Ok(Json(MeResponse {
        landing_path: principal.role.landing_path(),
        organization_wide: principal.role == Role::SuperAdmin,
        accessible_tenants,
        principal,
    }))
}
