//! Accessible tenant resolution.

use std::collections::BTreeSet;
use std::future::Future;

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::ScopeError;
use crate::auth::Principal;
use crate::db;
use crate::permissions::Role;

/// Source of the currently known tenants.
pub trait TenantDirectory: Send + Sync {
    /// IDs of every active local church.
    fn active_tenant_ids(&self) -> impl Future<Output = sqlx::Result<BTreeSet<Uuid>>> + Send;
}

impl TenantDirectory for PgPool {
    async fn active_tenant_ids(&self) -> sqlx::Result<BTreeSet<Uuid>> {
        db::list_active_tenant_ids(self).await
    }
}

/// Ordered set of local church IDs a principal may access.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TenantScope(BTreeSet<Uuid>);

impl TenantScope {
    #[must_use]
    pub const fn empty() -> Self {
        Self(BTreeSet::new())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn contains(&self, tenant_id: Uuid) -> bool {
        self.0.contains(&tenant_id)
    }

    /// The only tenant, when the scope has exactly one.
    #[must_use]
    pub fn single(&self) -> Option<Uuid> {
        if self.0.len() == 1 {
            self.0.first().copied()
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Uuid> for TenantScope {
    fn from_iter<I: IntoIterator<Item = Uuid>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeSet<Uuid>> for TenantScope {
    fn from(set: BTreeSet<Uuid>) -> Self {
        Self(set)
    }
}

/// Computes the tenants a principal may access.
#[derive(Debug, Clone)]
pub struct TenantScopeResolver<D> {
    directory: D,
}

impl<D: TenantDirectory> TenantScopeResolver<D> {
    pub const fn new(directory: D) -> Self {
        Self { directory }
    }

    /// Resolve the accessible tenant set.
    ///
    /// - SUPER_ADMIN: every active local church
    /// - homed principal: `{home}`
    /// - principal without a home: empty (sees nothing, not an error)
    ///
    /// A missing principal is a programming error.
    pub async fn resolve(&self, principal: Option<&Principal>) -> Result<TenantScope, ScopeError> {
        let principal = principal.ok_or(ScopeError::MissingPrincipal)?;

        if principal.role == Role::SuperAdmin {
            let all = self.directory.active_tenant_ids().await?;
            return Ok(all.into());
        }

        Ok(principal.home_tenant_id.into_iter().collect())
    }
}
