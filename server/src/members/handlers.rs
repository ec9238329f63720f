//! Member HTTP Handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::QueryBuilder;
use uuid::Uuid;
use validator::Validate;

use super::types::{CreateMemberRequest, MemberFilter, MemberListQuery};
use crate::api::AppState;
use crate::auth::Principal;
use crate::db::{self, NewUser, User};
use crate::error::AccessError;
use crate::permissions::{require_min_role, require_permission, Action, ResourceType, Role};

/// GET /api/members?local_church_id=&q=&role=
#[tracing::instrument(skip(state))]
pub async fn list_members(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<MemberListQuery>,
) -> Result<Json<Vec<User>>, AccessError> {
    require_permission(&principal, ResourceType::User, Action::Read)?;

    let tenant_override = query.local_church_id;
    let filter = state
        .guard
        .build(Some(&principal), MemberFilter::from(query), tenant_override)
        .await?;

    let mut builder = QueryBuilder::new("SELECT u.* FROM users u WHERE TRUE");
    filter.push_where(&mut builder, "u.local_church_id");
    builder.push(" ORDER BY u.name, u.id");

    let members = builder.build_query_as::<User>().fetch_all(&state.db).await?;
    Ok(Json(members))
}

/// Create a member. Callers cannot grant a role above their own.
///
/// POST /api/members
#[tracing::instrument(skip(state))]
pub async fn create_member(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<CreateMemberRequest>,
) -> Result<(StatusCode, Json<User>), AccessError> {
    require_permission(&principal, ResourceType::User, Action::Create)?;
    body.validate()?;

    require_min_role(&principal, body.role)?;

    let tenant_id = body.local_church_id.or(principal.home_tenant_id);
    match tenant_id {
        Some(tenant_id) => state.guard.ensure_writable(&principal, tenant_id).await?,
        // Only organization-wide staff may live outside a local church
        None if body.role == Role::SuperAdmin => {}
        None => {
            return Err(AccessError::validation(
                "local_church_id",
                "Local church is required",
            ))
        }
    }

    let email = body.email.trim().to_lowercase();
    if db::email_exists(&state.db, &email).await? {
        return Err(AccessError::validation("email", "Email is already registered"));
    }

    let user = db::create_user(
        &state.db,
        &NewUser {
            email: &email,
            name: body.name.trim(),
            role: body.role,
            local_church_id: tenant_id,
        },
    )
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AccessError::validation("email", "Email is already registered")
        }
        _ => AccessError::Database(e),
    })?;

    tracing::info!(member_id = %user.id, role = %user.role, "Member created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// Soft-deactivate a member.
///
/// DELETE /api/members/{id}
#[tracing::instrument(skip(state))]
pub async fn deactivate_member(
    State(state): State<AppState>,
    principal: Principal,
    Path(member_id): Path<Uuid>,
) -> Result<StatusCode, AccessError> {
    require_permission(&principal, ResourceType::User, Action::Delete)?;

    let member = db::find_user_by_id(&state.db, member_id)
        .await?
        .ok_or(AccessError::NotFound("Member"))?;

    match member.local_church_id {
        Some(tenant_id) => state.guard.ensure_writable(&principal, tenant_id).await?,
        None if principal.role == Role::SuperAdmin => {}
        None => return Err(AccessError::Forbidden),
    }

    if member.id == principal.id {
        return Err(AccessError::Forbidden);
    }
    require_min_role(&principal, member.role)?;

    if db::deactivate_user(&state.db, member.id).await? {
        tracing::info!(member_id = %member.id, "Member deactivated");
    }

    Ok(StatusCode::NO_CONTENT)
}
