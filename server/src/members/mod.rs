//! Member Directory
//!
//! Tenant-scoped user listing and lifecycle.

mod handlers;
pub mod types;

use axum::{
    routing::{delete, get},
    Router,
};

use crate::api::AppState;

/// Routes mounted at `/api/members`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_members).post(handlers::create_member))
        .route("/{id}", delete(handlers::deactivate_member))
}
