use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use super::TokenClaims;
use crate::roles::{ChurchRole, SystemRole};

/// Authenticated identity for a request, validated out of the token claims
/// at the middleware boundary so handlers never re-check shape.
///
/// Role fields are closed enums here. Unknown role strings in the token are
/// dropped during conversion (an unknown church role grants nothing, an
/// unknown system role falls back to the least-privileged value), matching
/// the lenient permission computation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: String,
    pub email: String,
    pub email_verified: bool,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub system_role: SystemRole,
    pub church_roles: BTreeMap<String, ChurchRole>,
    pub permissions: BTreeSet<String>,
    #[serde(skip)]
    pub issued_at: DateTime<Utc>,
}

impl From<TokenClaims> for Principal {
    fn from(claims: TokenClaims) -> Self {
        let system_role = SystemRole::parse(&claims.system_role).unwrap_or_default();
        let church_roles = claims
            .church_roles
            .iter()
            .filter_map(|(church_id, role)| {
                ChurchRole::parse(role).map(|r| (church_id.clone(), r))
            })
            .collect();

        Self {
            id: claims.sub,
            email: claims.email,
            email_verified: claims.email_verified,
            display_name: claims.name,
            photo_url: claims.picture,
            system_role,
            church_roles,
            permissions: claims.permissions.into_iter().collect(),
            issued_at: Utc.timestamp_opt(claims.iat, 0).single().unwrap_or_else(Utc::now),
        }
    }
}
