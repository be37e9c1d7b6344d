//! HTTP-level authorization behavior, driven through the real router over
//! the in-memory store.

mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use parish_api::store::{ClaimsStore, UserStore};

async fn body_json(response: axum::response::Response) -> Result<Value> {
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn send_json(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn missing_token_is_classified() -> Result<()> {
    let (app, _) = common::test_app().await;

    let res = app.oneshot(get("/api/auth/whoami", None)).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(res).await?;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"]["code"], json!("auth/no-token"));
    Ok(())
}

#[tokio::test]
async fn malformed_token_is_classified() -> Result<()> {
    let (app, _) = common::test_app().await;

    let res = app.oneshot(get("/api/auth/whoami", Some("not-a-jwt"))).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(res).await?["error"]["code"], json!("auth/invalid-token"));
    Ok(())
}

#[tokio::test]
async fn expired_token_is_classified() -> Result<()> {
    let (app, store) = common::test_app().await;
    let token = common::expired_token_for(&store, "member").await;

    let res = app.oneshot(get("/api/auth/whoami", Some(&token))).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(res).await?["error"]["code"], json!("auth/token-expired"));
    Ok(())
}

#[tokio::test]
async fn revoked_token_is_classified() -> Result<()> {
    let (app, store) = common::test_app().await;
    let token = common::token_for(&store, "member").await;

    // Revocation cut in the future covers the just-issued token
    store
        .revoke_tokens("member", Utc::now() + Duration::seconds(60))
        .await?;

    let res = app.oneshot(get("/api/auth/whoami", Some(&token))).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(res).await?["error"]["code"], json!("auth/token-revoked"));
    Ok(())
}

#[tokio::test]
async fn optional_route_proceeds_anonymously() -> Result<()> {
    let (app, _) = common::test_app().await;

    let res = app.oneshot(get("/auth/session", None)).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await?;
    assert_eq!(body["data"]["authenticated"], json!(false));
    assert_eq!(body["data"]["principal"], Value::Null);
    Ok(())
}

#[tokio::test]
async fn optional_route_decodes_a_valid_token() -> Result<()> {
    let (app, store) = common::test_app().await;
    let token = common::token_for(&store, "pastor").await;

    let res = app.oneshot(get("/auth/session", Some(&token))).await?;
    let body = body_json(res).await?;
    assert_eq!(body["data"]["authenticated"], json!(true));
    assert_eq!(body["data"]["principal"]["id"], json!("pastor"));
    Ok(())
}

#[tokio::test]
async fn whoami_returns_the_decoded_principal() -> Result<()> {
    let (app, store) = common::test_app().await;
    let token = common::token_for(&store, "pastor").await;

    let res = app.oneshot(get("/api/auth/whoami", Some(&token))).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await?;
    assert_eq!(body["data"]["id"], json!("pastor"));
    assert_eq!(body["data"]["churchRoles"]["c1"], json!("pastor"));
    assert!(body["data"]["permissions"]
        .as_array()
        .unwrap()
        .contains(&json!("admin:church")));
    Ok(())
}

#[tokio::test]
async fn login_issues_a_usable_token() -> Result<()> {
    let (app, _) = common::test_app().await;

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"email": "member@parish.test", "password": "password"}).to_string(),
                ))?,
        )
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await?;
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["user"]["systemRole"], json!("user"));

    let res = app.oneshot(get("/api/auth/whoami", Some(&token))).await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn login_rejects_a_wrong_password() -> Result<()> {
    let (app, _) = common::test_app().await;

    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"email": "member@parish.test", "password": "wrong"}).to_string(),
                ))?,
        )
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(res).await?["error"]["code"], json!("auth/invalid-credentials"));
    Ok(())
}

#[tokio::test]
async fn system_role_change_requires_a_system_admin() -> Result<()> {
    let (app, store) = common::test_app().await;
    let token = common::token_for(&store, "member").await;

    let res = app
        .oneshot(send_json(
            "PUT",
            "/api/users/pastor/role",
            &token,
            json!({"role": "system_admin"}),
        ))
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(res).await?["error"]["code"], json!("auth/forbidden"));
    Ok(())
}

#[tokio::test]
async fn unverified_email_cannot_mutate_roles() -> Result<()> {
    let (app, store) = common::test_app().await;
    let token = common::token_for(&store, "unverified").await;

    let res = app
        .oneshot(send_json(
            "PUT",
            "/api/users/member/role",
            &token,
            json!({"role": "user"}),
        ))
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(res).await?["error"]["code"],
        json!("auth/email-not-verified")
    );
    Ok(())
}

#[tokio::test]
async fn admin_promotes_a_user_and_refresh_picks_it_up() -> Result<()> {
    let (app, store) = common::test_app().await;
    let admin_token = common::token_for(&store, "admin").await;

    let res = app
        .clone()
        .oneshot(send_json(
            "PUT",
            "/api/users/member/role",
            &admin_token,
            json!({"role": "system_admin"}),
        ))
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await?;
    assert_eq!(body["data"]["systemRole"], json!("system_admin"));

    // The member's old token still carries the old claims; a refresh mints
    // one with the new permission set
    let member_token = common::token_for(&store, "member").await;
    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/refresh")
                .header("authorization", format!("Bearer {member_token}"))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_json(res).await?["data"]["permissions"]
        .as_array()
        .unwrap()
        .contains(&json!("admin:all")));
    Ok(())
}

#[tokio::test]
async fn invalid_role_value_is_a_bad_request() -> Result<()> {
    let (app, store) = common::test_app().await;
    let admin_token = common::token_for(&store, "admin").await;

    let res = app
        .oneshot(send_json(
            "PUT",
            "/api/users/member/role",
            &admin_token,
            json!({"role": "superuser"}),
        ))
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = body_json(res).await?;
    assert_eq!(body["error"]["code"], json!("invalid-role"));
    assert!(body["error"]["message"].as_str().unwrap().contains("superuser"));
    Ok(())
}

#[tokio::test]
async fn church_admin_grants_and_revokes_within_their_church() -> Result<()> {
    let (app, store) = common::test_app().await;
    let pastor_token = common::token_for(&store, "pastor").await;

    // Grant in c1 succeeds
    let res = app
        .clone()
        .oneshot(send_json(
            "PUT",
            "/api/users/member/churches/c1/role",
            &pastor_token,
            json!({"role": "leader"}),
        ))
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    // The pastor holds no role in c2
    let res = app
        .clone()
        .oneshot(send_json(
            "PUT",
            "/api/users/member/churches/c2/role",
            &pastor_token,
            json!({"role": "member"}),
        ))
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Revoke in c1 succeeds and the claims lose the entry
    let res = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/users/member/churches/c1/role")
                .header("authorization", format!("Bearer {pastor_token}"))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let claims = store.get_claims("member").await?;
    assert!(!claims.church_roles.contains_key("c1"));
    Ok(())
}

#[tokio::test]
async fn claims_are_readable_by_self_but_not_by_others() -> Result<()> {
    let (app, store) = common::test_app().await;

    let own = common::token_for(&store, "member").await;
    let res = app
        .clone()
        .oneshot(get("/api/users/member/claims", Some(&own)))
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await?["data"]["systemRole"], json!("user"));

    let res = app
        .oneshot(get("/api/users/admin/claims", Some(&own)))
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn logout_revokes_the_current_session() -> Result<()> {
    let (app, store) = common::test_app().await;

    // iat has second granularity and truncates down, so the logout instant
    // always covers a token issued just before it
    let fresh = common::token_for(&store, "member").await;

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/auth/session")
                .header("authorization", format!("Bearer {fresh}"))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = app.oneshot(get("/api/auth/whoami", Some(&fresh))).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(res).await?["error"]["code"], json!("auth/token-revoked"));
    Ok(())
}

#[tokio::test]
async fn health_reports_the_store() -> Result<()> {
    let (app, _) = common::test_app().await;

    let res = app.oneshot(get("/health", None)).await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await?["data"]["status"], json!("ok"));
    Ok(())
}
