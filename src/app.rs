use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config;
use crate::handlers::{auth, users};
use crate::middleware::{optional_auth, require_auth, require_verified_email};
use crate::store::{ClaimsStore, UserStore};

/// Shared handler state: the claims store and the user/profile store.
/// Trait objects so tests run the same router over the in-memory backend.
#[derive(Clone)]
pub struct AppState {
    pub claims: Arc<dyn ClaimsStore>,
    pub users: Arc<dyn UserStore>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        // Public auth routes
        .merge(public_auth_routes())
        .merge(session_routes(state.clone()))
        // Protected role/claims management
        .merge(user_routes(state.clone()))
        // Global middleware
        .layer(DefaultBodyLimit::max(config::config().api.max_request_size_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_auth_routes() -> Router<AppState> {
    Router::new().route("/auth/login", post(auth::login))
}

fn session_routes(state: AppState) -> Router<AppState> {
    let optional = Router::new()
        .route("/auth/session", get(auth::session))
        .route_layer(middleware::from_fn_with_state(state.clone(), optional_auth));

    let required = Router::new()
        .route("/api/auth/whoami", get(auth::whoami))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/session", delete(auth::logout))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    optional.merge(required)
}

fn user_routes(state: AppState) -> Router<AppState> {
    // Claims reads and refresh need authentication only
    let reads = Router::new()
        .route("/api/users/:id/claims", get(users::get_claims))
        .route("/api/users/:id/claims/refresh", post(users::refresh_claims))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Role mutations additionally require a verified email.
    // route_layer ordering: the last layer added runs first, so require_auth
    // is added after the email guard.
    let mutations = Router::new()
        .route("/api/users/:id/role", put(users::set_system_role))
        .route(
            "/api/users/:id/churches/:church_id/role",
            put(users::set_church_role).delete(users::remove_church_role),
        )
        .route_layer(middleware::from_fn(require_verified_email))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    reads.merge(mutations)
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Parish API",
            "version": version,
            "description": "Church management platform - authorization and claims service",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "login": "/auth/login (public - token acquisition)",
                "session": "/auth/session (public - optional auth)",
                "auth": "/api/auth/* (protected - whoami, refresh, logout)",
                "users": "/api/users/:id/* (protected - roles and claims)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match state.claims.ping().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "store": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": {
                    "code": "service-unavailable",
                    "message": "claims store unavailable"
                },
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "store_error": e.to_string()
                }
            })),
        ),
    }
}
