//! Database Models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::permissions::Role;

/// Whether a directory record is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "record_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Active,
    Inactive,
}

/// Top-level organization.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Church {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A local church: the unit of tenant isolation.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LocalChurch {
    pub id: Uuid,
    pub church_id: Uuid,
    pub name: String,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
}

/// User model.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Home local church; `None` for organization-wide staff.
    pub local_church_id: Option<Uuid>,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }
}

/// Input for [`super::create_user`].
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub role: Role,
    pub local_church_id: Option<Uuid>,
}
