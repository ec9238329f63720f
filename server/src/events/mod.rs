//! Events and Reservations
//!
//! Tenant-scoped events with capacity-bounded RSVPs.

mod handlers;
pub mod ledger;
pub mod types;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::api::AppState;

pub use ledger::{LedgerError, LedgerSettings, ReservationLedger};
pub use types::{CancelOutcome, Event, EventScope, Rsvp, RsvpStatus};

/// Routes mounted at `/api/events`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_events).post(handlers::create_event))
        .route("/{id}", get(handlers::get_event))
        .route("/{id}/rsvps", get(handlers::list_rsvps))
        .route("/{id}/rsvp", post(handlers::rsvp))
}

/// Routes mounted at `/api/rsvps`.
pub fn rsvp_router() -> Router<AppState> {
    Router::new().route("/{id}", delete(handlers::cancel_rsvp))
}
