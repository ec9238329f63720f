//! Authentication Error Types

use thiserror::Error;

/// Reasons a request could not be tied to a principal.
///
/// All variants except `Database` surface to callers as `Unauthenticated`.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing Authorization header.
    #[error("Missing authorization header")]
    MissingAuthHeader,

    /// Invalid authorization header format.
    #[error("Invalid authorization header format")]
    InvalidAuthHeader,

    /// Invalid or tampered token.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// Token subject does not name an active user.
    #[error("User not found or deactivated")]
    UserNotFound,

    /// Token could not be signed.
    #[error("Token error")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Database error while loading the principal.
    #[error("Database error")]
    Database(#[from] sqlx::Error),
}

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;
