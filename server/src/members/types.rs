//! Member Types

use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::permissions::Role;
use crate::tenancy::QueryFilter;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMemberRequest {
    #[validate(email(message = "Must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
    #[serde(default = "default_role")]
    pub role: Role,
    /// Defaults to the caller's home local church.
    pub local_church_id: Option<Uuid>,
}

const fn default_role() -> Role {
    Role::Member
}

#[derive(Debug, Default, Deserialize)]
pub struct MemberListQuery {
    pub local_church_id: Option<Uuid>,
    /// Case-insensitive match on name or email.
    pub q: Option<String>,
    pub role: Option<Role>,
}

/// Conditions on the `users u` alias. Only active users are listed.
#[derive(Debug, Clone, Default)]
pub struct MemberFilter {
    pub search: Option<String>,
    pub role: Option<Role>,
}

impl From<MemberListQuery> for MemberFilter {
    fn from(query: MemberListQuery) -> Self {
        Self {
            search: query
                .q
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty()),
            role: query.role,
        }
    }
}

impl QueryFilter for MemberFilter {
    fn push_conditions(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" AND u.status = 'active'");

        if let Some(search) = &self.search {
            let pattern = format!("%{}%", escape_like(search));
            builder
                .push(" AND (u.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR u.email ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(role) = self.role {
            builder.push(" AND u.role = ").push_bind(role);
        }
    }
}

fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_sql() {
        let filter = MemberFilter::from(MemberListQuery {
            local_church_id: None,
            q: Some("  ana ".into()),
            role: Some(Role::Leader),
        });
        assert_eq!(filter.search.as_deref(), Some("ana"));

        let mut builder = QueryBuilder::<Postgres>::new("SELECT u.* FROM users u WHERE TRUE");
        filter.push_conditions(&mut builder);
        assert_eq!(
            builder.sql(),
            "SELECT u.* FROM users u WHERE TRUE AND u.status = 'active' \
             AND (u.name ILIKE $1 OR u.email ILIKE $2) AND u.role = $3"
        );
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let filter = MemberFilter::from(MemberListQuery {
            q: Some("   ".into()),
            ..MemberListQuery::default()
        });
        assert!(filter.search.is_none());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn test_role_defaults_to_member() {
        let body: CreateMemberRequest = serde_json::from_value(serde_json::json!({
            "email": "new@example.com",
            "name": "New Member"
        }))
        .unwrap();
        assert_eq!(body.role, Role::Member);
        assert!(body.validate().is_ok());
    }
}
