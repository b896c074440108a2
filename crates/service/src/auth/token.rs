//! HS256 bearer tokens carrying the user id and platform-admin flag.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::AuthError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub email: String,
    /// Platform admin.
    #[serde(default)]
    pub adm: bool,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|e| AuthError::TokenError(e.to_string()))
    }
}

pub fn issue(secret: &str, user_id: Uuid, email: &str, is_admin: bool, ttl_hours: i64) -> Result<(String, i64), AuthError> {
    let now = chrono::Utc::now();
    let exp = (now + chrono::Duration::hours(ttl_hours)).timestamp();
    let claims = Claims { sub: user_id.to_string(), email: email.to_string(), adm: is_admin, iat: now.timestamp(), exp };
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AuthError::TokenError(e.to_string()))?;
    Ok((token, exp))
}

pub fn verify(secret: &str, token: &str) -> Result<Claims, AuthError> {
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::new(Algorithm::HS256))
        .map_err(|e| AuthError::TokenError(e.to_string()))?;
    Ok(data.claims)
}
