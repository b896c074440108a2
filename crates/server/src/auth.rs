use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use service::access::Actor;
use service::auth::token;

use crate::errors::JsonApiError;
use crate::state::ServerState;

pub const AUTH_COOKIE: &str = "auth_token";

/// Caller resolved by [`require_user`], available to handlers as an `Extension`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub is_admin: bool,
}

impl CurrentUser {
    pub fn actor(&self) -> Actor {
        Actor { user_id: self.id, is_admin: self.is_admin }
    }
}

/// `Authorization: Bearer <token>` first, then the `auth_token` cookie.
fn extract_token(req: &Request) -> Result<String, JsonApiError> {
    if let Some(h) = req.headers().get(header::AUTHORIZATION) {
        let value = h.to_str().map_err(|_| JsonApiError::unauthorized("malformed Authorization header"))?;
        return value
            .strip_prefix("Bearer ")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| JsonApiError::unauthorized("expected a Bearer token"));
    }
    let jar = CookieJar::from_headers(req.headers());
    jar.get(AUTH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| JsonApiError::unauthorized("missing credentials"))
}

/// Rejects requests without a valid token for an active account.
pub async fn require_user(State(state): State<ServerState>, mut req: Request, next: Next) -> Result<Response, JsonApiError> {
    let path = req.uri().path().to_string();
    let raw = extract_token(&req).inspect_err(|_| {
        tracing::warn!(%path, "request without credentials");
    })?;

    let claims = token::verify(&state.jwt_secret, &raw).map_err(|e| {
        tracing::warn!(%path, err = %e, "token validation failed");
        JsonApiError::unauthorized("invalid or expired token")
    })?;
    let user_id = claims.user_id().map_err(|_| JsonApiError::unauthorized("invalid token subject"))?;

    // The account may have been disabled since the token was issued.
    let user = state.auth.me(user_id).await.map_err(|e| {
        tracing::warn!(%path, %user_id, err = %e, "token for unusable account");
        JsonApiError::unauthorized("account unavailable")
    })?;

    req.extensions_mut().insert(CurrentUser { id: user.id, email: user.email, is_admin: user.is_admin });
    Ok(next.run(req).await)
}
