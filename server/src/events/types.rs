//! Event and Reservation Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::tenancy::QueryFilter;

// ============================================================================
// Event Entity
// ============================================================================

/// Audience an event is advertised to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_scope", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventScope {
    #[default]
    LocalChurch,
    WholeChurch,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Event {
    pub id: Uuid,
    pub local_church_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub capacity: i32,
    pub scope: EventScope,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Event with live reservation counts for list responses.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EventSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub event: Event,
    pub going_count: i64,
    pub waitlist_count: i64,
}

// ============================================================================
// Reservation Entity
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "rsvp_status", rename_all = "lowercase")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RsvpStatus {
    Going,
    Waitlist,
    Cancelled,
}

impl RsvpStatus {
    /// GOING and WAITLIST reservations hold a place.
    #[must_use]
    pub const fn is_live(self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Rsvp {
    pub id: Uuid,
    /// Insertion sequence, breaks `requested_at` ties.
    pub seq: i64,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub status: RsvpStatus,
    pub requested_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of cancelling a reservation.
#[derive(Debug, Clone, Serialize)]
pub struct CancelOutcome {
    pub cancelled: Rsvp,
    /// Waitlisted reservation moved to GOING by this cancellation.
    pub promoted: Option<Rsvp>,
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    /// Defaults to the caller's home local church.
    pub local_church_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    #[validate(range(min = 1, max = 100_000, message = "Capacity must be between 1 and 100000"))]
    pub capacity: i32,
    #[serde(default)]
    pub scope: EventScope,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventListQuery {
    pub local_church_id: Option<Uuid>,
    #[serde(default)]
    pub upcoming: bool,
}

// ============================================================================
// Query Filters
// ============================================================================

/// Conditions on the `events e` alias.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventFilter {
    pub id: Option<Uuid>,
    /// Only events that have not started yet.
    pub upcoming: bool,
}

impl QueryFilter for EventFilter {
    fn push_conditions(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        if let Some(id) = self.id {
            builder.push(" AND e.id = ").push_bind(id);
        }
        if self.upcoming {
            builder.push(" AND e.starts_at >= NOW()");
        }
    }
}
