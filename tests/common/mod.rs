use std::sync::Arc;

use axum::Router;
use chrono::Utc;

use parish_api::app::{app, AppState};
use parish_api::auth::{self, TokenClaims};
use parish_api::store::{ClaimsStore, MemoryStore, UserRecord, UserStore};

pub fn account(id: &str, email_verified: bool) -> UserRecord {
    UserRecord {
        id: id.to_string(),
        email: format!("{id}@parish.test"),
        password_hash: auth::hash_password("password"),
        display_name: Some(id.to_string()),
        photo_url: None,
        email_verified,
        system_role: "user".to_string(),
        tokens_revoked_at: None,
        created_at: Utc::now(),
    }
}

/// Router over a seeded in-memory store: a system admin, a pastor of church
/// "c1", a plain member, and an account with an unverified email.
pub async fn test_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());

    store.insert_user(account("admin", true)).await;
    store.set_system_role("admin", "system_admin").await.unwrap();

    store.insert_user(account("pastor", true)).await;
    store.set_church_role("pastor", "c1", "pastor").await.unwrap();

    store.insert_user(account("member", true)).await;
    store.set_church_role("member", "c1", "member").await.unwrap();

    store.insert_user(account("unverified", false)).await;

    let state = AppState {
        claims: store.clone(),
        users: store.clone(),
    };
    (app(state), store)
}

/// Freshly issued bearer token for a seeded account.
pub async fn token_for(store: &MemoryStore, user_id: &str) -> String {
    let user = store.find_by_id(user_id).await.unwrap().unwrap();
    let claims = store.get_claims(user_id).await.unwrap();
    auth::issue_token(&TokenClaims::new(&user, &claims)).unwrap()
}

/// Token whose `exp` is already in the past.
pub async fn expired_token_for(store: &MemoryStore, user_id: &str) -> String {
    let user = store.find_by_id(user_id).await.unwrap().unwrap();
    let claims = store.get_claims(user_id).await.unwrap();
    let mut token_claims = TokenClaims::new(&user, &claims);
    token_claims.iat = (Utc::now() - chrono::Duration::hours(4)).timestamp();
    token_claims.exp = (Utc::now() - chrono::Duration::hours(2)).timestamp();
    auth::issue_token(&token_claims).unwrap()
}
