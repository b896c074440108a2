use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use service::auth::errors::AuthError;
use service::errors::ServiceError;

/// Error body returned by every handler: `{ "error": <title>, "detail": <msg> }`.
#[derive(Debug, Serialize)]
pub struct JsonApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, title: &str, detail: Option<String>) -> Self {
        Self { status, error: title.to_string(), detail }
    }

    pub fn unauthorized(detail: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized", Some(detail.to_string()))
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl From<ServiceError> for JsonApiError {
    fn from(e: ServiceError) -> Self {
        let (status, title) = match &e {
            ServiceError::Validation(_) => (StatusCode::BAD_REQUEST, "Validation Error"),
            ServiceError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ServiceError::Forbidden(_) => (StatusCode::FORBIDDEN, "Forbidden"),
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "Not Found"),
            ServiceError::Conflict(_) => (StatusCode::CONFLICT, "Conflict"),
            ServiceError::InvalidTransition(_) => (StatusCode::CONFLICT, "Invalid Transition"),
            ServiceError::LimitExceeded(_) => (StatusCode::PAYMENT_REQUIRED, "Plan Limit Reached"),
            ServiceError::Gateway(_) => (StatusCode::BAD_GATEWAY, "Payment Gateway Error"),
            ServiceError::Db(_) => {
                error!(err = %e, "database failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Error")
            }
        };
        // Raw database messages stay in the logs.
        let detail = match e {
            ServiceError::Db(_) => None,
            other => Some(other.to_string()),
        };
        Self::new(status, title, detail)
    }
}

impl From<AuthError> for JsonApiError {
    fn from(e: AuthError) -> Self {
        let status = match &e {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Conflict => StatusCode::CONFLICT,
            AuthError::NotFound | AuthError::Unauthorized | AuthError::Disabled | AuthError::TokenError(_) => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::HashError(_) | AuthError::Repository(_) => {
                error!(code = e.code(), err = %e, "auth failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let title = status.canonical_reason().unwrap_or("Error");
        Self::new(status, title, Some(e.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_status_codes() {
        let cases = [
            (ServiceError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ServiceError::InvalidTransition("x".into()), StatusCode::CONFLICT),
            (ServiceError::LimitExceeded("x".into()), StatusCode::PAYMENT_REQUIRED),
            (ServiceError::Gateway("x".into()), StatusCode::BAD_GATEWAY),
        ];
        for (err, status) in cases {
            assert_eq!(JsonApiError::from(err).status, status);
        }
    }

    #[test]
    fn database_detail_is_hidden() {
        let e = JsonApiError::from(ServiceError::Db("relation \"x\" does not exist".into()));
        assert_eq!(e.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(e.detail.is_none());
    }

    #[test]
    fn bad_credentials_are_unauthorized() {
        let e = JsonApiError::from(AuthError::Unauthorized);
        assert_eq!(e.status, StatusCode::UNAUTHORIZED);
        assert_eq!(e.error, "Unauthorized");
    }

    #[test]
    fn disabled_accounts_are_unauthorized() {
        let e = JsonApiError::from(AuthError::Disabled);
        assert_eq!(e.status, StatusCode::UNAUTHORIZED);
        assert_eq!(e.detail.as_deref(), Some("account disabled"));
    }
}
