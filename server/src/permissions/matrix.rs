//! Static resource × role permission matrix.
//!
//! Each row lists, for one resource type, the actions every role may perform.
//! A role missing from a row gets nothing. `SuperAdmin` never consults the
//! table.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::roles::Role;

bitflags! {
    /// Set of CRUD actions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Actions: u8 {
        const CREATE = 1 << 0;
        const READ   = 1 << 1;
        const UPDATE = 1 << 2;
        const DELETE = 1 << 3;
    }
}

impl Actions {
    /// Read only.
    pub const R: Self = Self::READ;
    /// Read and update.
    pub const RU: Self = Self::READ.union(Self::UPDATE);
    /// Everything except delete.
    pub const CRU: Self = Self::CREATE.union(Self::READ).union(Self::UPDATE);
    /// Full CRUD.
    pub const CRUD: Self = Self::CRU.union(Self::DELETE);

    /// Check if all actions in `other` are present.
    #[must_use]
    pub const fn has(&self, other: Self) -> bool {
        self.contains(other)
    }
}

/// A single CRUD action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Self; 4] = [Self::Create, Self::Read, Self::Update, Self::Delete];

    #[must_use]
    pub const fn flag(self) -> Actions {
        match self {
            Self::Create => Actions::CREATE,
            Self::Read => Actions::READ,
            Self::Update => Actions::UPDATE,
            Self::Delete => Actions::DELETE,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl FromStr for Action {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tenant-owned entity type participating in the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceType {
    User,
    LifeGroup,
    Event,
    Pathway,
    LocalChurch,
    Church,
}

impl ResourceType {
    pub const ALL: [Self; 6] = [
        Self::User,
        Self::LifeGroup,
        Self::Event,
        Self::Pathway,
        Self::LocalChurch,
        Self::Church,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::LifeGroup => "lifeGroup",
            Self::Event => "event",
            Self::Pathway => "pathway",
            Self::LocalChurch => "localChurch",
            Self::Church => "church",
        }
    }
}

impl FromStr for ResourceType {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown resource type or action name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown name: {0}")]
pub struct UnknownName(pub String);

/// One row of the permission matrix.
#[derive(Debug)]
pub struct MatrixRow {
    pub resource: ResourceType,
    pub grants: &'static [(Role, Actions)],
}

/// The permission matrix. Adding a resource type means adding a row here.
pub static PERMISSION_MATRIX: &[MatrixRow] = &[
    MatrixRow {
        resource: ResourceType::Church,
        grants: &[(Role::Pastor, Actions::R), (Role::Admin, Actions::R)],
    },
    MatrixRow {
        resource: ResourceType::LocalChurch,
        grants: &[
            (Role::Pastor, Actions::RU),
            (Role::Admin, Actions::RU),
            (Role::Vip, Actions::R),
            (Role::Leader, Actions::R),
            (Role::Member, Actions::R),
        ],
    },
    MatrixRow {
        resource: ResourceType::User,
        grants: &[
            (Role::Pastor, Actions::CRUD),
            (Role::Admin, Actions::CRUD),
            (Role::Vip, Actions::CRU),
            (Role::Leader, Actions::R),
            (Role::Member, Actions::R),
        ],
    },
    MatrixRow {
        resource: ResourceType::LifeGroup,
        grants: &[
            (Role::Pastor, Actions::CRUD),
            (Role::Admin, Actions::CRUD),
            (Role::Vip, Actions::R),
            (Role::Leader, Actions::RU),
            (Role::Member, Actions::R),
        ],
    },
    MatrixRow {
        resource: ResourceType::Event,
        grants: &[
            (Role::Pastor, Actions::CRUD),
            (Role::Admin, Actions::CRUD),
            (Role::Vip, Actions::R),
            (Role::Leader, Actions::R),
            (Role::Member, Actions::R),
        ],
    },
    MatrixRow {
        resource: ResourceType::Pathway,
        grants: &[
            (Role::Pastor, Actions::CRUD),
            (Role::Admin, Actions::CRUD),
            (Role::Vip, Actions::R),
            (Role::Leader, Actions::R),
            (Role::Member, Actions::R),
        ],
    },
];

/// Look up the actions a role may perform on a resource type in `matrix`.
///
/// Missing rows and missing roles yield an empty set.
#[must_use]
pub fn lookup(matrix: &[MatrixRow], role: Role, resource: ResourceType) -> Actions {
    matrix
        .iter()
        .find(|row| row.resource == resource)
        .and_then(|row| row.grants.iter().find(|(r, _)| *r == role))
        .map_or(Actions::empty(), |(_, actions)| *actions)
}

/// Actions granted to `role` on `resource`.
#[must_use]
pub fn allowed_actions(role: Role, resource: ResourceType) -> Actions {
    if role == Role::SuperAdmin {
        return Actions::all();
    }
    lookup(PERMISSION_MATRIX, role, resource)
}

/// Check whether `role` may perform `action` on `resource`.
#[must_use]
pub fn can_manage_entity(role: Role, resource: ResourceType, action: Action) -> bool {
    allowed_actions(role, resource).has(action.flag())
}

/// String-keyed variant of [`can_manage_entity`] for wire-level input.
///
/// Unknown resource or action names fail closed for every role except
/// `SuperAdmin`.
#[must_use]
pub fn can_manage_entity_by_name(role: Role, resource: &str, action: &str) -> bool {
    if role == Role::SuperAdmin {
        return true;
    }
    match (resource.parse::<ResourceType>(), action.parse::<Action>()) {
        (Ok(resource), Ok(action)) => can_manage_entity(role, resource, action),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_super_admin_bypasses_matrix() {
        for resource in ResourceType::ALL {
            for action in Action::ALL {
                assert!(can_manage_entity(Role::SuperAdmin, resource, action));
            }
        }
    }

    #[test]
    fn test_every_resource_type_has_a_row() {
        for resource in ResourceType::ALL {
            assert!(
                PERMISSION_MATRIX.iter().any(|row| row.resource == resource),
                "missing matrix row for {resource}"
            );
        }
    }

    #[test]
    fn test_rows_are_unique() {
        for (i, row) in PERMISSION_MATRIX.iter().enumerate() {
            for other in &PERMISSION_MATRIX[i + 1..] {
                assert_ne!(row.resource, other.resource);
            }
        }
    }

    #[test]
    fn test_absent_role_is_denied_everything() {
        // VIP, LEADER and MEMBER have no `church` row entry.
        for role in [Role::Vip, Role::Leader, Role::Member] {
            for action in Action::ALL {
                assert!(!can_manage_entity(role, ResourceType::Church, action));
            }
        }
    }

    #[test]
    fn test_missing_row_fails_closed() {
        let partial = [MatrixRow {
            resource: ResourceType::Event,
            grants: &[(Role::Admin, Actions::CRUD)],
        }];
        for role in Role::ALL {
            assert_eq!(lookup(&partial, role, ResourceType::Pathway), Actions::empty());
        }
        assert_eq!(
            lookup(&partial, Role::Admin, ResourceType::Event),
            Actions::CRUD
        );
    }

    #[test]
    fn test_unknown_names_fail_closed() {
        for role in Role::ALL.into_iter().filter(|r| *r != Role::SuperAdmin) {
            for action in ["create", "read", "update", "delete"] {
                assert!(!can_manage_entity_by_name(role, "sermon", action));
            }
            assert!(!can_manage_entity_by_name(role, "event", "publish"));
        }
        assert!(can_manage_entity_by_name(Role::SuperAdmin, "sermon", "read"));
    }

    #[test]
    fn test_known_names_resolve() {
        assert!(can_manage_entity_by_name(Role::Admin, "lifeGroup", "delete"));
        assert!(can_manage_entity_by_name(Role::Leader, "lifeGroup", "update"));
        assert!(!can_manage_entity_by_name(Role::Leader, "lifeGroup", "delete"));
        assert!(can_manage_entity_by_name(Role::Vip, "user", "create"));
        assert!(!can_manage_entity_by_name(Role::Vip, "user", "delete"));
    }

    #[test]
    fn test_members_only_read() {
        for resource in ResourceType::ALL {
            let actions = allowed_actions(Role::Member, resource);
            assert!(!actions.intersects(Actions::CREATE | Actions::UPDATE | Actions::DELETE));
        }
    }

    #[test]
    fn test_admin_and_pastor_manage_events() {
        for role in [Role::Pastor, Role::Admin] {
            assert_eq!(allowed_actions(role, ResourceType::Event), Actions::CRUD);
        }
    }

    #[test]
    fn test_resource_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&ResourceType::LifeGroup).unwrap(),
            "\"lifeGroup\""
        );
        assert_eq!(
            "localChurch".parse::<ResourceType>(),
            Ok(ResourceType::LocalChurch)
        );
        assert!("LocalChurch".parse::<ResourceType>().is_err());
    }

    #[test]
    fn test_preset_combinations() {
        assert!(Actions::CRUD.has(Actions::CRU));
        assert!(Actions::CRU.has(Actions::RU));
        assert!(!Actions::CRU.has(Actions::DELETE));
        assert_eq!(Actions::CRUD, Actions::all());
    }
}
