//! Tenant Isolation
//!
//! Every read and write is restricted to the local churches a principal may
//! access. [`TenantScopeResolver`] computes that set; [`ScopedQueryGuard`]
//! turns it into a query predicate and checks write targets against it.

mod guard;
mod scope;

pub use guard::{scope_filter, QueryFilter, ScopedFilter, ScopedQueryGuard, TenantPredicate};
pub use scope::{TenantDirectory, TenantScope, TenantScopeResolver};

use thiserror::Error;
use uuid::Uuid;

/// Errors from scope resolution.
#[derive(Debug, Error)]
pub enum ScopeError {
    /// Scoping was attempted without an authenticated principal.
    #[error("Tenant scope requested without a principal")]
    MissingPrincipal,

    /// Target tenant is outside the principal's accessible set.
    #[error("Local church {requested} is outside the accessible scope")]
    TenantMismatch { requested: Uuid },

    /// The tenant directory could not be read.
    #[error("Tenant directory unavailable")]
    Directory(#[from] sqlx::Error),
}
