//! Access Error Taxonomy
//!
//! Business outcomes every domain action can produce, and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::auth::AuthError;
use crate::events::LedgerError;
use crate::tenancy::ScopeError;

/// Outcome of a failed access-controlled operation.
#[derive(Debug, Error)]
pub enum AccessError {
    /// No principal could be resolved from the request.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Role lacks the permission, independent of tenant.
    #[error("Insufficient permissions")]
    Forbidden,

    /// Role suffices, but the target tenant is outside the principal's scope.
    #[error("Cannot act on data belonging to another local church")]
    TenantMismatch,

    /// A live reservation already exists for this user and event.
    #[error("Already reserved for this event")]
    DuplicateReservation,

    /// A GOING reservation would exceed the event capacity.
    #[error("Event capacity exceeded")]
    CapacityExceeded,

    /// Concurrent writes conflicted and retries were exhausted.
    #[error("Request conflicted with concurrent updates, try again")]
    TransientConflict,

    /// Malformed input, reported with the first offending field.
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Entity does not exist or is outside the principal's scope.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Programming error, such as scope resolution without a principal.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Storage failure.
    #[error("Database error")]
    Database(#[from] sqlx::Error),
}

/// Error response body for JSON responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
    /// Offending field for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AccessError {
    /// Build a validation error for a single field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// HTTP status and machine-readable code.
    #[must_use]
    pub const fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::TenantMismatch => (StatusCode::FORBIDDEN, "TENANT_MISMATCH"),
            Self::DuplicateReservation => (StatusCode::CONFLICT, "DUPLICATE_RESERVATION"),
            Self::CapacityExceeded => (StatusCode::CONFLICT, "CAPACITY_EXCEEDED"),
            Self::TransientConflict => (StatusCode::SERVICE_UNAVAILABLE, "TRANSIENT_CONFLICT"),
            Self::Validation { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Internal(_) | Self::Database(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(detail) => {
                tracing::error!(%detail, "Internal error while enforcing access");
                "Internal server error".to_string()
            }
            Self::Database(err) => {
                tracing::error!(error = ?err, "Database error while enforcing access");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let field = match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        };

        (
            status,
            Json(ErrorResponse {
                error: code,
                message,
                field,
            }),
        )
            .into_response()
    }
}

impl From<ValidationErrors> for AccessError {
    /// Report the first offending field, ordered by field name.
    fn from(errors: ValidationErrors) -> Self {
        let first = errors
            .field_errors()
            .into_iter()
            .min_by(|(a, _), (b, _)| a.cmp(b))
            .and_then(|(field, errs)| errs.first().map(|e| (field.to_string(), e)));

        match first {
            Some((field, err)) => {
                let message = err
                    .message
                    .as_ref()
                    .map_or_else(|| err.code.to_string(), ToString::to_string);
                Self::Validation { field, message }
            }
            None => Self::validation("request", "invalid request"),
        }
    }
}

impl From<ScopeError> for AccessError {
    fn from(err: ScopeError) -> Self {
        match err {
            ScopeError::MissingPrincipal => Self::Internal(err.to_string()),
            ScopeError::TenantMismatch { .. } => Self::TenantMismatch,
            ScopeError::Directory(e) => Self::Database(e),
        }
    }
}

impl From<LedgerError> for AccessError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::EventNotFound => Self::NotFound("Event"),
            LedgerError::ReservationNotFound => Self::NotFound("Reservation"),
            LedgerError::DuplicateReservation => Self::DuplicateReservation,
            LedgerError::CapacityExceeded => Self::CapacityExceeded,
            LedgerError::TransientConflict => Self::TransientConflict,
            LedgerError::Database(e) => Self::Database(e),
        }
    }
}

impl From<AuthError> for AccessError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Database(e) => Self::Database(e),
            other => {
                tracing::debug!(reason = %other, "Rejected unauthenticated request");
                Self::Unauthenticated
            }
        }
    }
}
