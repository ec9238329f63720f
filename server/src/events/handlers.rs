//! Event HTTP Handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use sqlx::QueryBuilder;
use uuid::Uuid;
use validator::Validate;

use super::types::{
    CancelOutcome, CreateEventRequest, Event, EventFilter, EventListQuery, EventSummary, Rsvp,
};
use crate::api::AppState;
use crate::auth::Principal;
use crate::error::AccessError;
use crate::permissions::{authorize, require_permission, Action, ResourceType};
use crate::tenancy::ScopedFilter;

/// Load an event by ID, ignoring tenant scope. Callers check the tenant.
async fn find_event(state: &AppState, event_id: Uuid) -> Result<Event, AccessError> {
    sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AccessError::NotFound("Event"))
}

/// Events matching `filter` with live reservation counts.
async fn fetch_summaries(
    state: &AppState,
    filter: &ScopedFilter<EventFilter>,
) -> Result<Vec<EventSummary>, AccessError> {
    let mut builder = QueryBuilder::new(
        r"
        SELECT e.*,
               COUNT(r.id) FILTER (WHERE r.status = 'going') AS going_count,
               COUNT(r.id) FILTER (WHERE r.status = 'waitlist') AS waitlist_count
        FROM events e
        LEFT JOIN event_rsvps r ON r.event_id = e.id
        WHERE TRUE",
    );
    filter.push_where(&mut builder, "e.local_church_id");
    builder.push(" GROUP BY e.id ORDER BY e.starts_at, e.id");

    Ok(builder
        .build_query_as::<EventSummary>()
        .fetch_all(&state.db)
        .await?)
}

/// List events in the caller's scope with live reservation counts.
///
/// GET /api/events?local_church_id=&upcoming=
#[tracing::instrument(skip(state))]
pub async fn list_events(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<EventListQuery>,
) -> Result<Json<Vec<EventSummary>>, AccessError> {
    require_permission(&principal, ResourceType::Event, Action::Read)?;

    let filter = state
        .guard
        .build(
            Some(&principal),
            EventFilter {
                id: None,
                upcoming: query.upcoming,
            },
            query.local_church_id,
        )
        .await?;

    Ok(Json(fetch_summaries(&state, &filter).await?))
}

/// A single event in the caller's scope. Events elsewhere are not found.
///
/// GET /api/events/{id}
#[tracing::instrument(skip(state))]
pub async fn get_event(
    State(state): State<AppState>,
    principal: Principal,
    Path(event_id): Path<Uuid>,
) -> Result<Json<EventSummary>, AccessError> {
    require_permission(&principal, ResourceType::Event, Action::Read)?;

    let filter = state
        .guard
        .build(
            Some(&principal),
            EventFilter {
                id: Some(event_id),
                upcoming: false,
            },
            None,
        )
        .await?;

    fetch_summaries(&state, &filter)
        .await?
        .into_iter()
        .next()
        .map(Json)
        .ok_or(AccessError::NotFound("Event"))
}

/// Create an event in the caller's local church, or a named one in scope.
///
/// POST /api/events
#[tracing::instrument(skip(state))]
pub async fn create_event(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), AccessError> {
    require_permission(&principal, ResourceType::Event, Action::Create)?;
    body.validate()?;

    let tenant_id = body
        .local_church_id
        .or(principal.home_tenant_id)
        .ok_or_else(|| AccessError::validation("local_church_id", "Local church is required"))?;
    state.guard.ensure_writable(&principal, tenant_id).await?;

    let event = sqlx::query_as::<_, Event>(
        r"
        INSERT INTO events (id, local_church_id, name, description, starts_at, capacity, scope, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        ",
    )
    .bind(Uuid::now_v7())
    .bind(tenant_id)
    .bind(body.name.trim())
    .bind(body.description.as_deref())
    .bind(body.starts_at)
    .bind(body.capacity)
    .bind(body.scope)
    .bind(principal.id)
    .fetch_one(&state.db)
    .await?;

    tracing::info!(event_id = %event.id, local_church_id = %tenant_id, "Event created");
    Ok((StatusCode::CREATED, Json(event)))
}

/// Attendee list: GOING first, then the waitlist in queue order.
///
/// GET /api/events/{id}/rsvps
#[tracing::instrument(skip(state))]
pub async fn list_rsvps(
    State(state): State<AppState>,
    principal: Principal,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Vec<Rsvp>>, AccessError> {
    require_permission(&principal, ResourceType::Event, Action::Update)?;

    let event = find_event(&state, event_id).await?;
    state
        .guard
        .ensure_writable(&principal, event.local_church_id)
        .await?;

    Ok(Json(state.ledger.list_for_event(event.id).await?))
}

/// Reserve a place for the caller.
///
/// POST /api/events/{id}/rsvp
#[tracing::instrument(skip(state))]
pub async fn rsvp(
    State(state): State<AppState>,
    principal: Principal,
    Path(event_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Rsvp>), AccessError> {
    require_permission(&principal, ResourceType::Event, Action::Read)?;

    let event = find_event(&state, event_id).await?;
    state
        .guard
        .ensure_writable(&principal, event.local_church_id)
        .await?;

    let rsvp = state
        .ledger
        .reserve(event.id, principal.id, Utc::now())
        .await?;

    Ok((StatusCode::CREATED, Json(rsvp)))
}

/// Cancel a reservation. Owners may cancel their own; otherwise the caller
/// needs event update rights in the event's local church.
///
/// DELETE /api/rsvps/{id}
#[tracing::instrument(skip(state))]
pub async fn cancel_rsvp(
    State(state): State<AppState>,
    principal: Principal,
    Path(rsvp_id): Path<Uuid>,
) -> Result<Json<CancelOutcome>, AccessError> {
    let rsvp = state
        .ledger
        .find(rsvp_id)
        .await?
        .ok_or(AccessError::NotFound("Reservation"))?;

    if rsvp.user_id != principal.id {
        if !authorize(&principal, ResourceType::Event, Action::Update) {
            return Err(AccessError::Forbidden);
        }
        let event = find_event(&state, rsvp.event_id).await?;
        state
            .guard
            .ensure_writable(&principal, event.local_church_id)
            .await?;
    }

    Ok(Json(state.ledger.cancel(rsvp.id).await?))
}
