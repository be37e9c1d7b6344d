//! Permission predicates shared by every route gate.
//!
//! Pure functions over a decoded [`Principal`]; no I/O. The `Option`
//! variants exist for optional-auth routes where an anonymous caller must
//! fail every non-public check.

use crate::roles::{perm, ChurchRole, SystemRole};

use super::Principal;

impl Principal {
    pub fn is_system_admin(&self) -> bool {
        self.system_role == SystemRole::SystemAdmin
    }

    /// System admins administer every church; otherwise an admin or pastor
    /// role for this church is required.
    pub fn is_church_admin(&self, church_id: &str) -> bool {
        self.is_system_admin()
            || self
                .church_roles
                .get(church_id)
                .is_some_and(|role| role.is_admin())
    }

    pub fn has_church_role(&self, church_id: &str, allowed: &[ChurchRole]) -> bool {
        self.is_system_admin()
            || self
                .church_roles
                .get(church_id)
                .is_some_and(|role| allowed.contains(role))
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(perm::ADMIN_ALL) || self.permissions.contains(permission)
    }
}

pub fn is_system_admin(principal: Option<&Principal>) -> bool {
    principal.is_some_and(Principal::is_system_admin)
}

pub fn is_church_admin(principal: Option<&Principal>, church_id: &str) -> bool {
    principal.is_some_and(|p| p.is_church_admin(church_id))
}

pub fn has_church_role(
    principal: Option<&Principal>,
    church_id: &str,
    allowed: &[ChurchRole],
) -> bool {
    principal.is_some_and(|p| p.has_church_role(church_id, allowed))
}

pub fn has_permission(principal: Option<&Principal>, permission: &str) -> bool {
    principal.is_some_and(|p| p.has_permission(permission))
}
