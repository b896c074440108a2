mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::json;

use common::{build_app, PASSWORD};
use models::status::UserStatus;

#[tokio::test]
async fn health_is_public() -> anyhow::Result<()> {
    let app = build_app().await?;
    let (status, body) = app.call("GET", "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn test_register_and_login_flow() -> anyhow::Result<()> {
    let app = build_app().await?;

    let reg = json!({"email": "Ada@Example.com", "name": "Ada", "password": PASSWORD});
    let (status, body) = app.call("POST", "/auth/register", None, Some(reg.clone())).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["is_admin"], false);

    let (status, body) = app.call("POST", "/auth/register", None, Some(reg)).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict");

    // Login sets the cookie and returns the token.
    let req = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&json!({"email": "ada@example.com", "password": PASSWORD}))?))?;
    let resp = tower::ServiceExt::oneshot(app.router.clone(), req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cookie.starts_with("auth_token="));
    assert!(cookie.contains("HttpOnly"));

    // The cookie alone authenticates.
    let token_pair = cookie.split(';').next().unwrap_or_default().to_string();
    let req = Request::builder().uri("/auth/me").header(header::COOKIE, token_pair).body(Body::empty())?;
    let (status, me) = app.send(req).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "ada@example.com");
    Ok(())
}

#[tokio::test]
async fn bearer_token_reaches_protected_routes() -> anyhow::Result<()> {
    let app = build_app().await?;
    let token = app.signup("bob@example.com").await?;

    let (status, me) = app.call("GET", "/auth/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "Tester");

    let (status, _) = app.call("GET", "/auth/me", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.call("GET", "/stores", Some("not-a-jwt"), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_rejected() -> anyhow::Result<()> {
    let app = build_app().await?;
    app.signup("carol@example.com").await?;
    let (status, _) = app
        .call("POST", "/auth/login", None, Some(json!({"email": "carol@example.com", "password": "wrong-pass"})))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call("POST", "/auth/register", None, Some(json!({"email": "dan@example.com", "name": "Dan", "password": "short"})))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn disabled_account_cannot_log_in() -> anyhow::Result<()> {
    let app = build_app().await?;
    let token = app.signup("erin@example.com").await?;

    let found = models::user::find_by_email(&app.db, "erin@example.com").await?;
    let mut am: models::user::ActiveModel = found.ok_or_else(|| anyhow::anyhow!("user missing"))?.into();
    am.status = Set(UserStatus::Disabled);
    am.update(&app.db).await?;

    let (status, body) = app
        .call("POST", "/auth/login", None, Some(json!({"email": "erin@example.com", "password": PASSWORD})))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
    // Tokens issued before the account was disabled stop working too.
    let (status, _) = app.call("GET", "/auth/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn logout_clears_cookie() -> anyhow::Result<()> {
    let app = build_app().await?;
    let req = Request::builder()
        .method("POST")
        .uri("/auth/logout")
        .header(header::COOKIE, "auth_token=stale")
        .body(Body::empty())?;
    let resp = tower::ServiceExt::oneshot(app.router.clone(), req).await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let cookie = resp.headers().get(header::SET_COOKIE).and_then(|v| v.to_str().ok()).unwrap_or_default();
    assert!(cookie.starts_with("auth_token="));
    Ok(())
}

#[tokio::test]
async fn malformed_bodies_get_json_errors() -> anyhow::Result<()> {
    let app = build_app().await?;

    let req = Request::builder()
        .method("POST")
        .uri("/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\": "))?;
    let (status, body) = app.send(req).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad Request");
    assert!(body["detail"].as_str().is_some());

    let (status, body) = app.call("POST", "/auth/register", None, Some(json!({"email": "a@b.io"}))).await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Unprocessable Entity");
    Ok(())
}
