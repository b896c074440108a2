#![allow(dead_code)]
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::Value;
use tower::ServiceExt;

use server::{routes, state::ServerState};
use service::auth::service::AuthConfig;
use service::payment::gateway::mock::MockGateway;

pub const ADMIN_EMAIL: &str = "root@shop.test";
pub const PASSWORD: &str = "S3curePass!";

pub struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
    pub gateway: Arc<MockGateway>,
}

/// Router over a fresh migrated in-memory database and an in-memory gateway.
pub async fn build_app() -> anyhow::Result<TestApp> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await?;
    migration::Migrator::up(&db, None).await?;

    let mut auth = AuthConfig::with_secret("test-secret");
    auth.admin_emails = vec![ADMIN_EMAIL.to_string()];
    let gateway = Arc::new(MockGateway::default());
    let state = ServerState::new(db.clone(), auth, gateway.clone(), 60);
    let router = routes::build_router(state, tower_http::cors::CorsLayer::very_permissive());
    Ok(TestApp { router, db, gateway })
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> anyhow::Result<(StatusCode, Value)> {
        let resp = self.router.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await?;
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
        Ok((status, json))
    }

    pub async fn call(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> anyhow::Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => builder.header(header::CONTENT_TYPE, "application/json").body(Body::from(serde_json::to_vec(&b)?))?,
            None => builder.body(Body::empty())?,
        };
        self.send(req).await
    }

    /// Register and log in; returns the bearer token.
    pub async fn signup(&self, email: &str) -> anyhow::Result<String> {
        let body = serde_json::json!({"email": email, "name": "Tester", "password": PASSWORD});
        let (status, _) = self.call("POST", "/auth/register", None, Some(body)).await?;
        assert_eq!(status, StatusCode::CREATED, "register {email}");
        let body = serde_json::json!({"email": email, "password": PASSWORD});
        let (status, json) = self.call("POST", "/auth/login", None, Some(body)).await?;
        assert_eq!(status, StatusCode::OK, "login {email}");
        Ok(json["token"].as_str().unwrap_or_default().to_string())
    }

    pub async fn create_store(&self, token: &str, name: &str) -> anyhow::Result<String> {
        let (status, json) = self.call("POST", "/stores", Some(token), Some(serde_json::json!({"name": name}))).await?;
        assert_eq!(status, StatusCode::CREATED);
        Ok(json["id"].as_str().unwrap_or_default().to_string())
    }

    pub async fn post_form(&self, uri: &str, form: &str) -> anyhow::Result<(StatusCode, Value)> {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))?;
        self.send(req).await
    }
}
