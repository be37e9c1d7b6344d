use axum::{
    extract::{Extension, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::auth::{self, AuthError, Principal};
use crate::error::ApiError;

/// Authentication middleware, required variant: a missing, expired, revoked
/// or malformed bearer token rejects the request with a classified 401.
/// On success the decoded [`Principal`] is injected into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = authenticate(&state, &headers).await?;
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Optional variant: same decoding, but absence or failure of the
/// credential yields an anonymous request (`None`) instead of a rejection.
/// Downstream checks treat `None` as "no permissions beyond public read".
pub async fn optional_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    let principal = authenticate(&state, &headers).await.ok();
    request.extensions_mut().insert::<Option<Principal>>(principal);
    next.run(request).await
}

/// Runs after [`require_auth`]; rejects principals whose email address is
/// not verified. Applied to role-mutation routes.
pub async fn require_verified_email(
    Extension(principal): Extension<Principal>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !principal.email_verified {
        return Err(ApiError::Forbidden {
            code: "auth/email-not-verified",
            message: "Email address must be verified for this operation".to_string(),
        });
    }
    Ok(next.run(request).await)
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Principal, ApiError> {
    let token = bearer_token(headers).ok_or(AuthError::NoToken)?;
    let claims = auth::verify_token(&token)?;
    let principal = Principal::from(claims);

    // Tokens minted at or before a server-side revocation cut (logout) are
    // rejected even though their signature still verifies
    if let Some(revoked_at) = state.users.tokens_revoked_at(&principal.id).await? {
        if principal.issued_at <= revoked_at {
            return Err(AuthError::TokenRevoked.into());
        }
    }

    Ok(principal)
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("authorization")?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}
