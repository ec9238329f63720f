//! Local Churches

use axum::{extract::State, routing::get, Json, Router};
use sqlx::QueryBuilder;

use crate::api::AppState;
use crate::auth::Principal;
use crate::db::LocalChurch;
use crate::error::AccessError;
use crate::permissions::{require_permission, Action, ResourceType};

/// Routes mounted at `/api/local-churches`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_local_churches))
}

/// Local churches the caller may access.
///
/// GET /api/local-churches
#[tracing::instrument(skip(state))]
pub async fn list_local_churches(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<LocalChurch>>, AccessError> {
    require_permission(&principal, ResourceType::LocalChurch, Action::Read)?;

    let filter = state.guard.build(Some(&principal), (), None).await?;

    let mut builder = QueryBuilder::new("SELECT lc.* FROM local_churches lc WHERE TRUE");
    filter.push_where(&mut builder, "lc.id");
    builder.push(" ORDER BY lc.name, lc.id");

    let churches = builder
        .build_query_as::<LocalChurch>()
        .fetch_all(&state.db)
        .await?;

    Ok(Json(churches))
}
