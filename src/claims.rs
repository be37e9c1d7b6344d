//! Claims blob and permission derivation.
//!
//! The blob is the persisted and token-propagated record of a principal's
//! roles and derived permissions. Field names follow the stored wire format
//! (`systemRole`, `churchRoles`, ...) so existing blobs keep deserializing.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::roles::{self, SystemRole};

/// Per-principal claims record. Permissions are always derived from the two
/// role fields via [`calculate_permissions`] and never set directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimsBlob {
    #[serde(default = "default_system_role")]
    pub system_role: String,
    /// Church id -> church role. Keys are opaque church ids; a deleted
    /// church leaves its entry behind (lazy invalidation).
    #[serde(default)]
    pub church_roles: BTreeMap<String, String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refreshed_at: Option<DateTime<Utc>>,
}

fn default_system_role() -> String {
    SystemRole::default().as_str().to_string()
}

impl ClaimsBlob {
    /// Claims for a principal with nothing stored yet: least-privileged
    /// system role, no church roles, base read permission.
    pub fn default_claims() -> Self {
        let system_role = default_system_role();
        let church_roles = BTreeMap::new();
        let permissions = calculate_permissions(&system_role, &church_roles);
        Self {
            system_role,
            church_roles,
            permissions,
            updated_at: Utc::now(),
            refreshed_at: None,
        }
    }

    /// Recompute the permission set from the current role fields.
    pub fn recalculate(&mut self) {
        self.permissions = calculate_permissions(&self.system_role, &self.church_roles);
    }
}

/// Derive the permission set for a system role plus a church-role map.
///
/// Pure and deterministic: the result is the deduplicated union of the
/// system role's permissions and those of every church role in the map,
/// returned in sorted order so repeated calls compare equal. Unknown role
/// values contribute nothing rather than failing.
pub fn calculate_permissions(
    system_role: &str,
    church_roles: &BTreeMap<String, String>,
) -> Vec<String> {
    let mut set: BTreeSet<&str> = roles::system_permissions(system_role).iter().copied().collect();
    for role in church_roles.values() {
        set.extend(roles::church_permissions(role).iter().copied());
    }
    set.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::perm;

    fn roles_of(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(church, role)| (church.to_string(), role.to_string()))
            .collect()
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let map = roles_of(&[("c1", "pastor"), ("c2", "member")]);
        let a = calculate_permissions("user", &map);
        let b = calculate_permissions("user", &map);
        assert_eq!(a, b);
        let mut sorted = a.clone();
        sorted.sort();
        assert_eq!(a, sorted);
    }

    #[test]
    fn user_plus_pastor_union() {
        let map = roles_of(&[("churchA", "pastor")]);
        let perms = calculate_permissions("user", &map);
        for expected in [
            perm::READ_PUBLIC,
            perm::READ_CHURCH,
            perm::WRITE_CHURCH,
            perm::DELETE_CHURCH,
            perm::ADMIN_CHURCH,
        ] {
            assert!(perms.iter().any(|p| p == expected), "missing {expected}");
        }
        assert!(!perms.iter().any(|p| p == perm::ADMIN_ALL));
    }

    #[test]
    fn adding_a_church_role_never_removes_permissions() {
        let mut map = roles_of(&[("c1", "member")]);
        let before = calculate_permissions("user", &map);
        map.insert("c2".to_string(), "leader".to_string());
        let after = calculate_permissions("user", &map);
        for p in &before {
            assert!(after.contains(p), "permission {p} lost after map grew");
        }
    }

    #[test]
    fn unknown_roles_contribute_nothing() {
        let map = roles_of(&[("c1", "deacon")]);
        assert_eq!(
            calculate_permissions("superuser", &map),
            Vec::<String>::new()
        );
        assert_eq!(
            calculate_permissions("user", &map),
            vec![perm::READ_PUBLIC.to_string()]
        );
    }

    #[test]
    fn default_claims_shape() {
        let claims = ClaimsBlob::default_claims();
        assert_eq!(claims.system_role, "user");
        assert!(claims.church_roles.is_empty());
        assert_eq!(claims.permissions, vec![perm::READ_PUBLIC.to_string()]);
        assert!(claims.refreshed_at.is_none());
    }

    #[test]
    fn blob_serializes_with_wire_field_names() {
        let claims = ClaimsBlob::default_claims();
        let value = serde_json::to_value(&claims).unwrap();
        assert!(value.get("systemRole").is_some());
        assert!(value.get("churchRoles").is_some());
        assert!(value.get("updatedAt").is_some());
        assert!(value.get("refreshedAt").is_none());
    }
}
