//! Database Queries
//!
//! Runtime queries (no compile-time `DATABASE_URL` required).
//! Directory reads here are unscoped; request paths go through the tenant
//! guard instead.

use std::collections::BTreeSet;

use sqlx::{PgPool, Postgres, Transaction};
use tracing::error;
use uuid::Uuid;

use super::models::{Church, LocalChurch, NewUser, User};
use crate::auth::Membership;

/// Log and return a database error with context.
macro_rules! db_error {
    ($query:expr, $($field:tt)*) => {
        |e| {
            error!(query = $query, $($field)*, error = %e, "Database query failed");
            e
        }
    };
}

// ============================================================================
// Organization Queries
// ============================================================================

/// Create a church organization.
pub async fn create_church(pool: &PgPool, name: &str) -> sqlx::Result<Church> {
    sqlx::query_as::<_, Church>("INSERT INTO churches (id, name) VALUES ($1, $2) RETURNING *")
        .bind(Uuid::now_v7())
        .bind(name)
        .fetch_one(pool)
        .await
        .map_err(db_error!("create_church", name = %name))
}

/// Create a local church under `church_id`.
pub async fn create_local_church(
    pool: &PgPool,
    church_id: Uuid,
    name: &str,
) -> sqlx::Result<LocalChurch> {
    sqlx::query_as::<_, LocalChurch>(
        r"
        INSERT INTO local_churches (id, church_id, name)
        VALUES ($1, $2, $3)
        RETURNING *
        ",
    )
    .bind(Uuid::now_v7())
    .bind(church_id)
    .bind(name)
    .fetch_one(pool)
    .await
    .map_err(db_error!("create_local_church", church_id = %church_id))
}

/// IDs of every active local church.
pub async fn list_active_tenant_ids(pool: &PgPool) -> sqlx::Result<BTreeSet<Uuid>> {
    let ids: Vec<Uuid> =
        sqlx::query_scalar("SELECT id FROM local_churches WHERE status = 'active'")
            .fetch_all(pool)
            .await?;

    Ok(ids.into_iter().collect())
}

// ============================================================================
// User Queries
// ============================================================================

/// Find user by ID, regardless of status.
pub async fn find_user_by_id(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_user_by_id", user_id = %id))
}

/// Find an active user by ID.
pub async fn find_active_user(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND status = 'active'")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_active_user", user_id = %id))
}

/// Check if email exists.
pub async fn email_exists(pool: &PgPool, email: &str) -> sqlx::Result<bool> {
    let result: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(email)
        .fetch_one(pool)
        .await?;

    Ok(result.0)
}

/// Create a user and, when homed, their membership in the home church.
pub async fn create_user(pool: &PgPool, new: &NewUser<'_>) -> sqlx::Result<User> {
    let mut tx = pool.begin().await?;

    let user = sqlx::query_as::<_, User>(
        r"
        INSERT INTO users (id, email, name, role, local_church_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        ",
    )
    .bind(Uuid::now_v7())
    .bind(new.email)
    .bind(new.name)
    .bind(new.role)
    .bind(new.local_church_id)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(local_church_id) = new.local_church_id {
        upsert_membership(&mut tx, user.id, local_church_id, new.role).await?;
    }

    tx.commit().await?;
    Ok(user)
}

/// Grant `role` in `local_church_id`, replacing any existing grant there.
pub async fn upsert_membership(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    local_church_id: Uuid,
    role: crate::permissions::Role,
) -> sqlx::Result<()> {
    sqlx::query(
        r"
        INSERT INTO memberships (user_id, local_church_id, role)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, local_church_id) DO UPDATE SET role = EXCLUDED.role
        ",
    )
    .bind(user_id)
    .bind(local_church_id)
    .bind(role)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Memberships of a user, oldest first.
pub async fn list_memberships(pool: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<Membership>> {
    sqlx::query_as::<_, Membership>(
        r"
        SELECT local_church_id AS tenant_id, role
        FROM memberships
        WHERE user_id = $1
        ORDER BY joined_at, local_church_id
        ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(db_error!("list_memberships", user_id = %user_id))
}

/// Soft-delete a user. Returns `false` if already inactive or missing.
pub async fn deactivate_user(pool: &PgPool, id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query(
        r"
        UPDATE users SET status = 'inactive', updated_at = NOW()
        WHERE id = $1 AND status = 'active'
        ",
    )
    .bind(id)
    .execute(pool)
    .await
    .map_err(db_error!("deactivate_user", user_id = %id))?;

    Ok(result.rows_affected() > 0)
}
