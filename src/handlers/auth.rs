//! Session handlers: login, whoami, token refresh, logout.
//!
//! Role changes never take effect on outstanding tokens; the subject picks
//! them up by refreshing, which re-reads the stored claims blob.

use axum::extract::{Extension, Json, State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::{self, Principal, TokenClaims};
use crate::config;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /auth/login - authenticate and receive a JWT carrying the claims blob
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Value> {
    let invalid =
        || ApiError::unauthorized("auth/invalid-credentials", "Invalid email or password");

    let user = state
        .users
        .find_by_email(&body.email)
        .await?
        .ok_or_else(invalid)?;

    if auth::hash_password(&body.password) != user.password_hash {
        tracing::warn!("Failed login attempt for '{}'", body.email);
        return Err(invalid());
    }

    let claims = state.claims.get_claims(&user.id).await?;
    let token = auth::issue_token(&TokenClaims::new(&user, &claims))?;

    Ok(ApiResponse::success(json!({
        "token": token,
        "expiresIn": config::config().security.jwt_expiry_hours * 3600,
        "user": {
            "id": user.id,
            "email": user.email,
            "emailVerified": user.email_verified,
            "displayName": user.display_name,
            "photoUrl": user.photo_url,
            "systemRole": claims.system_role,
            "churchRoles": claims.church_roles,
            "permissions": claims.permissions,
        }
    })))
}

/// GET /api/auth/whoami - the authenticated principal as decoded from the token
pub async fn whoami(Extension(principal): Extension<Principal>) -> ApiResult<Principal> {
    Ok(ApiResponse::success(principal))
}

/// GET /auth/session - optional-auth introspection; anonymous callers get
/// `authenticated: false` rather than a 401
pub async fn session(Extension(principal): Extension<Option<Principal>>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "authenticated": principal.is_some(),
        "principal": principal,
    })))
}

/// POST /api/auth/refresh - mint a fresh token from the currently stored
/// claims blob; this is how a role change reaches the client
pub async fn refresh(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Value> {
    let user = state
        .users
        .find_by_id(&principal.id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("auth/invalid-token", "Account no longer exists"))?;

    let claims = state.claims.get_claims(&principal.id).await?;
    let token = auth::issue_token(&TokenClaims::new(&user, &claims))?;

    Ok(ApiResponse::success(json!({
        "token": token,
        "expiresIn": config::config().security.jwt_expiry_hours * 3600,
        "permissions": claims.permissions,
    })))
}

/// DELETE /api/auth/session - logout; every token issued up to now stops
/// verifying as `auth/token-revoked`
pub async fn logout(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<()> {
    state.users.revoke_tokens(&principal.id, Utc::now()).await?;
    tracing::info!("Revoked sessions for '{}'", principal.id);
    Ok(ApiResponse::<()>::no_content())
}
