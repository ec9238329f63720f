//! Role hierarchy.
//!
//! Roles form a total order. `SuperAdmin` sits at the top and bypasses every
//! role and permission check.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Platform role assigned to a user.
///
/// Stored as the `user_role` enum in `PostgreSQL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    Pastor,
    Admin,
    Vip,
    Leader,
    Member,
}

impl Role {
    /// Every role, highest rank first.
    pub const ALL: [Self; 6] = [
        Self::SuperAdmin,
        Self::Pastor,
        Self::Admin,
        Self::Vip,
        Self::Leader,
        Self::Member,
    ];

    /// Position in the hierarchy. Higher is more privileged.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::SuperAdmin => 6,
            Self::Pastor => 5,
            Self::Admin => 4,
            Self::Vip => 3,
            Self::Leader => 2,
            Self::Member => 1,
        }
    }

    /// Wire and storage name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "SUPER_ADMIN",
            Self::Pastor => "PASTOR",
            Self::Admin => "ADMIN",
            Self::Vip => "VIP",
            Self::Leader => "LEADER",
            Self::Member => "MEMBER",
        }
    }

    /// Default client route a user with this role lands on after sign-in.
    #[must_use]
    pub const fn landing_path(self) -> &'static str {
        match self {
            Self::SuperAdmin => "/super",
            Self::Pastor | Self::Admin => "/admin",
            Self::Vip => "/vip/firsttimers",
            Self::Leader | Self::Member => "/dashboard",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Check that `actual` is at least as privileged as `required`.
///
/// `SuperAdmin` always passes.
#[must_use]
pub const fn has_min_role(actual: Role, required: Role) -> bool {
    matches!(actual, Role::SuperAdmin) || actual.rank() >= required.rank()
}

/// Check that `actual` is one of `allowed`.
///
/// `SuperAdmin` always passes; an empty `allowed` list rejects everyone else.
#[must_use]
pub fn has_any_role(actual: Role, allowed: &[Role]) -> bool {
    actual == Role::SuperAdmin || allowed.contains(&actual)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_is_strictly_monotonic() {
        for pair in Role::ALL.windows(2) {
            assert!(
                pair[0].rank() > pair[1].rank(),
                "{} should outrank {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_has_min_role_monotonicity() {
        for high in Role::ALL {
            for low in Role::ALL {
                if high.rank() > low.rank() {
                    assert!(has_min_role(high, low), "{high} >= {low}");
                    assert!(!has_min_role(low, high), "{low} < {high}");
                }
            }
        }
    }

    #[test]
    fn test_has_min_role_is_reflexive() {
        for role in Role::ALL {
            assert!(has_min_role(role, role));
        }
    }

    #[test]
    fn test_super_admin_passes_every_min_role() {
        for required in Role::ALL {
            assert!(has_min_role(Role::SuperAdmin, required));
        }
    }

    #[test]
    fn test_has_any_role() {
        assert!(has_any_role(Role::Leader, &[Role::Leader, Role::Admin]));
        assert!(!has_any_role(Role::Member, &[Role::Leader, Role::Admin]));
        // Membership, not rank: a pastor is not implicitly in a leader-only list.
        assert!(!has_any_role(Role::Pastor, &[Role::Leader]));
    }

    #[test]
    fn test_has_any_role_empty_list() {
        for role in Role::ALL {
            assert_eq!(has_any_role(role, &[]), role == Role::SuperAdmin);
        }
    }

    #[test]
    fn test_parse_round_trips_display() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>(), Ok(role));
        }
        assert!("OWNER".parse::<Role>().is_err());
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&Role::SuperAdmin).unwrap();
        assert_eq!(json, "\"SUPER_ADMIN\"");
        let role: Role = serde_json::from_str("\"VIP\"").unwrap();
        assert_eq!(role, Role::Vip);
    }

    #[test]
    fn test_landing_paths() {
        assert_eq!(Role::SuperAdmin.landing_path(), "/super");
        assert_eq!(Role::Admin.landing_path(), "/admin");
        assert_eq!(Role::Pastor.landing_path(), "/admin");
        assert_eq!(Role::Vip.landing_path(), "/vip/firsttimers");
        assert_eq!(Role::Leader.landing_path(), "/dashboard");
        assert_eq!(Role::Member.landing_path(), "/dashboard");
    }
}
