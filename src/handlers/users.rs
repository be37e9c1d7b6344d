//! Role-mutation and claims routes, consumed by the back office and the
//! membership-approval flow. All of them wrap the claims store adapter;
//! nothing else in the platform touches it directly.

use axum::extract::{Extension, Json, Path, State};
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::Principal;
use crate::claims::ClaimsBlob;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct RoleBody {
    pub role: String,
}

fn require_self_or_system_admin(principal: &Principal, user_id: &str) -> Result<(), ApiError> {
    if principal.is_system_admin() || principal.id == user_id {
        return Ok(());
    }
    Err(ApiError::forbidden("Not allowed to access this user's claims"))
}

/// GET /api/users/:id/claims - current claims blob (self or system admin)
pub async fn get_claims(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(user_id): Path<String>,
) -> ApiResult<ClaimsBlob> {
    require_self_or_system_admin(&principal, &user_id)?;
    let claims = state.claims.get_claims(&user_id).await?;
    Ok(ApiResponse::success(claims))
}

/// PUT /api/users/:id/role - replace the system role (system admin only).
/// The subject's outstanding tokens keep their old claims until refreshed.
pub async fn set_system_role(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(user_id): Path<String>,
    Json(body): Json<RoleBody>,
) -> ApiResult<ClaimsBlob> {
    if !principal.is_system_admin() {
        return Err(ApiError::forbidden("System role changes require a system admin"));
    }

    let claims = state.claims.set_system_role(&user_id, &body.role).await?;
    tracing::info!(
        "System role of '{}' set to '{}' by '{}'",
        user_id,
        claims.system_role,
        principal.id
    );
    Ok(ApiResponse::success(claims))
}

/// PUT /api/users/:id/churches/:church_id/role - grant or change a church
/// role (church admin of that church, or system admin)
pub async fn set_church_role(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((user_id, church_id)): Path<(String, String)>,
    Json(body): Json<RoleBody>,
) -> ApiResult<ClaimsBlob> {
    if !principal.is_church_admin(&church_id) {
        return Err(ApiError::forbidden("Church role changes require a church admin"));
    }

    let claims = state
        .claims
        .set_church_role(&user_id, &church_id, &body.role)
        .await?;
    tracing::info!(
        "Church role of '{}' in '{}' set to '{}' by '{}'",
        user_id,
        church_id,
        body.role,
        principal.id
    );
    Ok(ApiResponse::success(claims))
}

/// DELETE /api/users/:id/churches/:church_id/role - revoke a church role
pub async fn remove_church_role(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((user_id, church_id)): Path<(String, String)>,
) -> ApiResult<ClaimsBlob> {
    if !principal.is_church_admin(&church_id) {
        return Err(ApiError::forbidden("Church role changes require a church admin"));
    }

    let claims = state.claims.remove_church_role(&user_id, &church_id).await?;
    tracing::info!(
        "Church role of '{}' in '{}' removed by '{}'",
        user_id,
        church_id,
        principal.id
    );
    Ok(ApiResponse::success(claims))
}

/// POST /api/users/:id/claims/refresh - re-derive permissions from the
/// stored roles (self or system admin); repairs drift after a table change
pub async fn refresh_claims(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(user_id): Path<String>,
) -> ApiResult<ClaimsBlob> {
    require_self_or_system_admin(&principal, &user_id)?;
    let claims = state.claims.refresh_claims(&user_id).await?;
    Ok(ApiResponse::success(claims))
}
