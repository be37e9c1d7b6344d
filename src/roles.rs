use serde::{Deserialize, Serialize};

/// Permission tags used across the platform. Opaque strings on the wire;
/// constants here so route gates and the role table can't drift apart.
pub mod perm {
    /// Catch-all held only by system admins.
    pub const ADMIN_ALL: &str = "admin:all";
    pub const READ_PUBLIC: &str = "read:public";
    pub const READ_CHURCH: &str = "read:church";
    pub const WRITE_CHURCH: &str = "write:church";
    pub const DELETE_CHURCH: &str = "delete:church";
    pub const ADMIN_CHURCH: &str = "admin:church";
}

/// Account-wide privilege level. Exactly one per principal; absence
/// defaults to the least-privileged value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemRole {
    SystemAdmin,
    #[default]
    User,
}

impl SystemRole {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "system_admin" => Some(SystemRole::SystemAdmin),
            "user" => Some(SystemRole::User),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SystemRole::SystemAdmin => "system_admin",
            SystemRole::User => "user",
        }
    }

    pub fn permissions(&self) -> &'static [&'static str] {
        match self {
            SystemRole::SystemAdmin => &[perm::ADMIN_ALL],
            SystemRole::User => &[perm::READ_PUBLIC],
        }
    }
}

/// Privilege level scoped to a single church. A principal holds at most one
/// per church id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChurchRole {
    Admin,
    Pastor,
    Leader,
    Staff,
    Member,
    #[default]
    Visitor,
}

impl ChurchRole {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(ChurchRole::Admin),
            "pastor" => Some(ChurchRole::Pastor),
            "leader" => Some(ChurchRole::Leader),
            "staff" => Some(ChurchRole::Staff),
            "member" => Some(ChurchRole::Member),
            "visitor" => Some(ChurchRole::Visitor),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChurchRole::Admin => "admin",
            ChurchRole::Pastor => "pastor",
            ChurchRole::Leader => "leader",
            ChurchRole::Staff => "staff",
            ChurchRole::Member => "member",
            ChurchRole::Visitor => "visitor",
        }
    }

    pub fn permissions(&self) -> &'static [&'static str] {
        match self {
            ChurchRole::Admin | ChurchRole::Pastor => &[
                perm::READ_CHURCH,
                perm::WRITE_CHURCH,
                perm::DELETE_CHURCH,
                perm::ADMIN_CHURCH,
            ],
            ChurchRole::Leader | ChurchRole::Staff => {
                &[perm::READ_CHURCH, perm::WRITE_CHURCH]
            }
            ChurchRole::Member => &[perm::READ_CHURCH],
            ChurchRole::Visitor => &[perm::READ_PUBLIC],
        }
    }

    /// Roles that carry administrative rights over their church.
    pub fn is_admin(&self) -> bool {
        matches!(self, ChurchRole::Admin | ChurchRole::Pastor)
    }
}

/// Permission list for a system role given as a raw string. Unknown values
/// yield an empty list rather than an error so a stale role in a stored
/// claims blob degrades to zero extra permissions instead of failing the
/// whole computation.
pub fn system_permissions(role: &str) -> &'static [&'static str] {
    match SystemRole::parse(role) {
        Some(role) => role.permissions(),
        None => &[],
    }
}

/// Permission list for a church role given as a raw string; same lenient
/// contract as [`system_permissions`].
pub fn church_permissions(role: &str) -> &'static [&'static str] {
    match ChurchRole::parse(role) {
        Some(role) => role.permissions(),
        None => &[],
    }
}
