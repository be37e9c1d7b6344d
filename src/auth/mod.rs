use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::claims::ClaimsBlob;
use crate::config;
use crate::store::UserRecord;

pub mod checks;
pub mod principal;

pub use principal::Principal;

/// JWT payload: registered claims plus the custom claims blob fields. The
/// role fields keep the stored camelCase names and stay loosely typed here;
/// they are validated into a [`Principal`] at the middleware boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(rename = "systemRole", default)]
    pub system_role: String,
    #[serde(rename = "churchRoles", default)]
    pub church_roles: BTreeMap<String, String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

impl TokenClaims {
    pub fn new(user: &UserRecord, claims: &ClaimsBlob) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user.id.clone(),
            email: user.email.clone(),
            email_verified: user.email_verified,
            name: user.display_name.clone(),
            picture: user.photo_url.clone(),
            system_role: claims.system_role.clone(),
            church_roles: claims.church_roles.clone(),
            permissions: claims.permissions.clone(),
            iat: now.timestamp(),
            exp,
        }
    }
}

/// Credential failures, classified so clients can decide between a token
/// refresh and a full re-login.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("No bearer token provided")]
    NoToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("JWT secret not configured")]
    MissingSecret,
}

impl AuthError {
    /// Stable wire code for the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::NoToken => "auth/no-token",
            AuthError::TokenExpired => "auth/token-expired",
            AuthError::TokenRevoked => "auth/token-revoked",
            AuthError::InvalidToken(_) => "auth/invalid-token",
            AuthError::MissingSecret => "auth/invalid-token",
        }
    }
}

pub fn issue_token(claims: &TokenClaims) -> Result<String, AuthError> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

pub fn verify_token(token: &str) -> Result<TokenClaims, AuthError> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    match decode::<TokenClaims>(token, &decoding_key, &validation) {
        Ok(data) => Ok(data.claims),
        Err(e) => match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(AuthError::TokenExpired),
            _ => Err(AuthError::InvalidToken(e.to_string())),
        },
    }
}

/// SHA-256 hex digest of a password for comparison against the stored hash.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_user() -> UserRecord {
        UserRecord {
            id: "u1".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: hash_password("secret"),
            display_name: Some("Alice".to_string()),
            photo_url: None,
            email_verified: true,
            system_role: "user".to_string(),
            tokens_revoked_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn issued_token_round_trips() {
        let user = test_user();
        let claims = ClaimsBlob::default_claims();
        let token = issue_token(&TokenClaims::new(&user, &claims)).unwrap();

        let decoded = verify_token(&token).unwrap();
        assert_eq!(decoded.sub, "u1");
        assert_eq!(decoded.system_role, "user");
        assert_eq!(decoded.permissions, claims.permissions);
    }

    #[test]
    fn expired_token_classified() {
        let user = test_user();
        let claims = ClaimsBlob::default_claims();
        let mut token_claims = TokenClaims::new(&user, &claims);
        token_claims.iat = (Utc::now() - Duration::hours(4)).timestamp();
        token_claims.exp = (Utc::now() - Duration::hours(2)).timestamp();
        let token = issue_token(&token_claims).unwrap();

        assert!(matches!(verify_token(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn garbage_token_classified_invalid() {
        assert!(matches!(
            verify_token("not-a-jwt"),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn hash_is_stable_hex() {
        assert_eq!(hash_password("secret"), hash_password("secret"));
        assert_eq!(hash_password("secret").len(), 64);
    }
}
