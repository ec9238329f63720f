//! Authentication Middleware

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::api::AppState;
use crate::error::AccessError;

use super::error::AuthError;
use super::jwt::validate_access_token;
use super::principal::Principal;

/// Middleware to require authentication.
///
/// Extracts the Bearer token from the Authorization header, validates it,
/// loads the principal from the database, and injects it into request
/// extensions.
///
/// ```ignore
/// Router::new()
///     .route("/protected", get(handler))
///     .layer(axum::middleware::from_fn_with_state(state, require_auth))
/// ```
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AccessError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingAuthHeader)?
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidAuthHeader)?;

    let claims = validate_access_token(token, &state.config.jwt_secret)?;
    let user_id = claims.user_id()?;

    let principal = Principal::load(&state.db, user_id)
        .await
        .map_err(AuthError::from)?
        .ok_or(AuthError::UserNotFound)?;

    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

/// Extractor for the authenticated principal in handlers.
///
/// A missing principal is `Unauthenticated`, never a guest default.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AccessError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(AccessError::Unauthenticated)
    }
}
