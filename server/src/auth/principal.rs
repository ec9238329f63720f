//! The authenticated actor.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::permissions::Role;

/// Per-tenant role grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Membership {
    pub tenant_id: Uuid,
    pub role: Role,
}

/// The actor performing an operation.
///
/// Passed explicitly into every authorization and scoping call; there is no
/// ambient "current user".
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Local church the principal belongs to, if any.
    pub home_tenant_id: Option<Uuid>,
    pub memberships: Vec<Membership>,
}

impl Principal {
    /// Load an active user and their memberships.
    ///
    /// Returns `None` for unknown or deactivated users.
    #[tracing::instrument(skip(pool))]
    pub async fn load(pool: &PgPool, user_id: Uuid) -> sqlx::Result<Option<Self>> {
        let Some(user) = db::find_active_user(pool, user_id).await? else {
            return Ok(None);
        };
        let memberships = db::list_memberships(pool, user_id).await?;

        Ok(Some(Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            home_tenant_id: user.local_church_id,
            memberships,
        }))
    }
}

