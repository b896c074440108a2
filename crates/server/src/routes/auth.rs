use axum::{extract::State, http::StatusCode, Extension};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use uuid::Uuid;

use service::auth::domain::{AuthUser, LoginInput, RegisterInput};

use crate::auth::{CurrentUser, AUTH_COOKIE};
use crate::errors::JsonApiError;
use crate::extract::Json;
use crate::state::ServerState;

#[derive(Debug, Serialize)]
pub struct UserOutput {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
}

impl From<AuthUser> for UserOutput {
    fn from(u: AuthUser) -> Self {
        Self { user_id: u.id, email: u.email, name: u.name, is_admin: u.is_admin }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginOutput {
    #[serde(flatten)]
    pub user: UserOutput,
    pub token: String,
    /// Unix seconds.
    pub expires_at: i64,
}

#[utoipa::path(post, path = "/auth/register", tag = "auth", request_body = crate::openapi::RegisterRequest, responses((status = 201, description = "Registered"), (status = 400, description = "Bad Request"), (status = 409, description = "Conflict")))]
pub async fn register(State(state): State<ServerState>, Json(input): Json<RegisterInput>) -> Result<(StatusCode, Json<UserOutput>), JsonApiError> {
    let user = state.auth.register(input).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[utoipa::path(post, path = "/auth/login", tag = "auth", request_body = crate::openapi::LoginRequest, responses((status = 200, description = "Logged In"), (status = 401, description = "Unauthorized")))]
pub async fn login(State(state): State<ServerState>, jar: CookieJar, Json(input): Json<LoginInput>) -> Result<(CookieJar, Json<LoginOutput>), JsonApiError> {
    let session = state.auth.login(input).await?;
    let (Some(token), Some(expires_at)) = (session.token, session.expires_at) else {
        tracing::error!("login succeeded but no token was issued; jwt secret missing");
        return Err(JsonApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Token Generation Failed", None));
    };

    let mut cookie = Cookie::new(AUTH_COOKIE, token.clone());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(false);
    cookie.set_same_site(SameSite::Lax);
    let out = LoginOutput { user: session.user.into(), token, expires_at };
    Ok((jar.add(cookie), Json(out)))
}

#[utoipa::path(post, path = "/auth/logout", tag = "auth", responses((status = 204, description = "Cookie cleared")))]
pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    let mut cookie = Cookie::from(AUTH_COOKIE);
    cookie.set_path("/");
    (jar.remove(cookie), StatusCode::NO_CONTENT)
}

#[utoipa::path(get, path = "/auth/me", tag = "auth", security(("bearer" = [])), responses((status = 200, description = "Current user"), (status = 401, description = "Unauthorized")))]
pub async fn me(State(state): State<ServerState>, Extension(user): Extension<CurrentUser>) -> Result<Json<UserOutput>, JsonApiError> {
    let u = state.auth.me(user.id).await?;
    Ok(Json(u.into()))
}
