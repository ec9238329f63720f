//! Role hierarchy and permission matrix.
//!
//! Two checks answer "who may act on what":
//! - Role hierarchy: "at least this privileged" comparisons
//! - Permission matrix: per resource type × role CRUD grants
//!
//! Neither check raises; callers turn `false` into a `Forbidden` outcome.

pub mod matrix;
pub mod roles;

pub use matrix::{
    allowed_actions, can_manage_entity, can_manage_entity_by_name, Action, Actions, ResourceType,
    PERMISSION_MATRIX,
};
pub use roles::{has_any_role, has_min_role, Role};

use crate::auth::Principal;
use crate::error::AccessError;

/// Decide whether `principal` may perform `action` on `resource`.
#[must_use]
pub fn authorize(principal: &Principal, resource: ResourceType, action: Action) -> bool {
    can_manage_entity(principal.role, resource, action)
}

/// Require a matrix permission, mapping a denial to [`AccessError::Forbidden`].
pub fn require_permission(
    principal: &Principal,
    resource: ResourceType,
    action: Action,
) -> Result<(), AccessError> {
    if authorize(principal, resource, action) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %principal.id,
            role = %principal.role,
            %resource,
            %action,
            "Permission denied"
        );
        Err(AccessError::Forbidden)
    }
}

/// Require that `principal` holds at least `required`.
pub fn require_min_role(principal: &Principal, required: Role) -> Result<(), AccessError> {
    if has_min_role(principal.role, required) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %principal.id,
            role = %principal.role,
            %required,
            "Role below required minimum"
        );
        Err(AccessError::Forbidden)
    }
}
