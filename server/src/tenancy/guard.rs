//! Tenant-scoped query construction.
//!
//! Filters render as ` AND <condition>` fragments appended to a query that
//! already has a `WHERE` clause.

use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::scope::{TenantDirectory, TenantScope, TenantScopeResolver};
use super::ScopeError;
use crate::auth::Principal;

/// Conditions a caller wants applied before tenant scoping.
pub trait QueryFilter {
    /// Append ` AND ...` conditions to `builder`.
    fn push_conditions(&self, builder: &mut QueryBuilder<'_, Postgres>);
}

/// No extra conditions.
impl QueryFilter for () {
    fn push_conditions(&self, _builder: &mut QueryBuilder<'_, Postgres>) {}
}

/// Restriction on the tenant column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantPredicate {
    /// No accessible tenant; matches no rows.
    MatchNone,
    Eq(Uuid),
    In(Vec<Uuid>),
}

impl TenantPredicate {
    /// Evaluate the predicate against a row's tenant.
    #[must_use]
    pub fn matches(&self, tenant_id: Uuid) -> bool {
        match self {
            Self::MatchNone => false,
            Self::Eq(id) => *id == tenant_id,
            Self::In(ids) => ids.contains(&tenant_id),
        }
    }

    /// Render against `column`.
    pub fn push_sql(&self, builder: &mut QueryBuilder<'_, Postgres>, column: &str) {
        match self {
            Self::MatchNone => {
                builder.push(" AND FALSE");
            }
            Self::Eq(id) => {
                builder.push(" AND ").push(column).push(" = ").push_bind(*id);
            }
            Self::In(ids) => {
                builder
                    .push(" AND ")
                    .push(column)
                    .push(" = ANY(")
                    .push_bind(ids.clone())
                    .push(")");
            }
        }
    }
}

/// A base filter combined with a tenant predicate.
#[derive(Debug, Clone)]
pub struct ScopedFilter<F> {
    pub base: F,
    pub tenant: TenantPredicate,
}

impl<F: QueryFilter> ScopedFilter<F> {
    /// Append base conditions, then the tenant restriction on `tenant_column`.
    pub fn push_where(&self, builder: &mut QueryBuilder<'_, Postgres>, tenant_column: &str) {
        self.base.push_conditions(builder);
        self.tenant.push_sql(builder, tenant_column);
    }
}

/// Combine `base` with the tenant restriction implied by `accessible`.
///
/// An override inside the scope narrows to that tenant. Any other override,
/// including one against an empty scope, is a [`ScopeError::TenantMismatch`].
pub fn scope_filter<F>(
    accessible: &TenantScope,
    base: F,
    tenant_override: Option<Uuid>,
) -> Result<ScopedFilter<F>, ScopeError> {
    let tenant = match tenant_override {
        Some(requested) if accessible.contains(requested) => TenantPredicate::Eq(requested),
        Some(requested) => return Err(ScopeError::TenantMismatch { requested }),
        None if accessible.is_empty() => TenantPredicate::MatchNone,
        None => match accessible.single() {
            Some(id) => TenantPredicate::Eq(id),
            None => TenantPredicate::In(accessible.iter().collect()),
        },
    };

    Ok(ScopedFilter { base, tenant })
}

/// Scopes every read and checks every write target.
#[derive(Debug, Clone)]
pub struct ScopedQueryGuard<D> {
    resolver: TenantScopeResolver<D>,
}

impl<D: TenantDirectory> ScopedQueryGuard<D> {
    pub const fn new(directory: D) -> Self {
        Self {
            resolver: TenantScopeResolver::new(directory),
        }
    }

    /// Tenants `principal` may access.
    pub async fn accessible_tenants(&self, principal: &Principal) -> Result<TenantScope, ScopeError> {
        self.resolver.resolve(Some(principal)).await
    }

    /// Build a tenant-scoped filter for a read.
    #[tracing::instrument(skip(self, principal, base))]
    pub async fn build<F>(
        &self,
        principal: Option<&Principal>,
        base: F,
        tenant_override: Option<Uuid>,
    ) -> Result<ScopedFilter<F>, ScopeError> {
        let accessible = self.resolver.resolve(principal).await?;
        let filter = scope_filter(&accessible, base, tenant_override);

        if let Err(ScopeError::TenantMismatch { requested }) = &filter {
            tracing::debug!(
                user_id = ?principal.map(|p| p.id),
                %requested,
                "Tenant override outside accessible scope"
            );
        }
        filter
    }

    /// Check that `target` may be written by `principal`.
    #[tracing::instrument(skip(self, principal), fields(user_id = %principal.id))]
    pub async fn ensure_writable(
        &self,
        principal: &Principal,
        target: Uuid,
    ) -> Result<(), ScopeError> {
        let accessible = self.resolver.resolve(Some(principal)).await?;
        if accessible.contains(target) {
            Ok(())
        } else {
            tracing::debug!(user_id = %principal.id, %target, "Write outside accessible scope");
            Err(ScopeError::TenantMismatch { requested: target })
        }
    }
}
