use std::sync::Arc;

use argon2::{Argon2, password_hash::{PasswordHasher, PasswordVerifier, SaltString}, PasswordHash};
use rand::rngs::OsRng;
use tracing::{info, debug, instrument};
use uuid::Uuid;

use super::domain::{RegisterInput, LoginInput, AuthUser, AuthSession};
use super::errors::AuthError;
use super::repository::AuthRepository;
use super::token;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Auth service configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub password_algorithm: String,
    pub token_ttl_hours: i64,
    /// Lower-cased emails that register as platform admins.
    pub admin_emails: Vec<String>,
}

impl AuthConfig {
    pub fn with_secret(secret: &str) -> Self {
        Self { jwt_secret: Some(secret.to_string()), password_algorithm: "argon2".into(), token_ttl_hours: 12, admin_emails: Vec::new() }
    }
}

impl From<&configs::AuthConfig> for AuthConfig {
    fn from(c: &configs::AuthConfig) -> Self {
        Self {
            jwt_secret: Some(c.jwt_secret.clone()),
            password_algorithm: "argon2".into(),
            token_ttl_hours: c.token_ttl_hours,
            admin_emails: c.admin_emails.clone(),
        }
    }
}

/// Auth business service independent of web framework
pub struct AuthService<R: AuthRepository> {
    repo: Arc<R>,
    cfg: AuthConfig,
}

impl<R: AuthRepository> AuthService<R> {
    pub fn new(repo: Arc<R>, cfg: AuthConfig) -> Self { Self {
        repo, cfg }
    }

    /// Register a new user with a hashed password.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::RegisterInput;
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo, AuthConfig::with_secret("secret"));
    /// let input = RegisterInput { email: "User@Example.com".into(), name: "Test".into(), password: "Secret123".into() };
    /// let user = tokio_test::block_on(svc.register(input)).unwrap();
    /// assert_eq!(user.email, "user@example.com");
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthUser, AuthError> {
        let email = models::user::normalize_email(&input.email);
        models::user::validate_email(&email)?;
        models::user::validate_name(&input.name)?;
        if input.password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!("password too short (>={})", MIN_PASSWORD_LEN)));
        }
        if let Some(existing) = self.repo.find_user_by_email(&email).await? {
            debug!("user exists: {}", existing.email);
            return Err(AuthError::Conflict);
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(input.password.as_bytes(), &salt)
            .map_err(|e| AuthError::HashError(e.to_string()))?
            .to_string();

        let is_admin = self.cfg.admin_emails.iter().any(|a| a == &email);
        let user = self
            .repo
            .create_user_with_password(&email, input.name.trim(), is_admin, hash, &self.cfg.password_algorithm)
            .await?;
        info!(user_id = %user.id, email = %user.email, is_admin, "user_registered");
        Ok(user)
    }

    /// Authenticate a user and issue a token when a secret is configured.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::{RegisterInput, LoginInput};
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo.clone(), AuthConfig::with_secret("secret"));
    /// let _ = tokio_test::block_on(svc.register(RegisterInput { email: "u@e.com".into(), name: "N".into(), password: "Passw0rd".into() }));
    /// let session = tokio_test::block_on(svc.login(LoginInput { email: "u@e.com".into(), password: "Passw0rd".into() })).unwrap();
    /// assert_eq!(session.user.email, "u@e.com");
    /// assert!(session.token.is_some());
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let email = models::user::normalize_email(&input.email);
        let user = self.repo
            .find_user_by_email(&email)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let cred = self.repo
            .get_credentials(user.id)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let parsed = PasswordHash::new(&cred.password_hash).map_err(|e| AuthError::HashError(e.to_string()))?;
        if Argon2::default().verify_password(input.password.as_bytes(), &parsed).is_err() {
            return Err(AuthError::Unauthorized);
        }
        if !user.active {
            return Err(AuthError::Disabled);
        }

        let (token, expires_at) = match &self.cfg.jwt_secret {
            Some(secret) => {
                let (t, exp) = token::issue(secret, user.id, &user.email, user.is_admin, self.cfg.token_ttl_hours)?;
                (Some(t), Some(exp))
            }
            None => (None, None),
        };

        info!(user_id = %user.id, "user_logged_in");
        Ok(AuthSession { user, token, expires_at })
    }

    /// Current user behind a verified token; inactive accounts are rejected.
    pub async fn me(&self, user_id: Uuid) -> Result<AuthUser, AuthError> {
        let user = self.repo.find_user_by_id(user_id).await?.ok_or(AuthError::NotFound)?;
        if !user.active {
            return Err(AuthError::Disabled);
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository::mock::MockAuthRepository;

    fn svc(admins: &[&str]) -> (Arc<MockAuthRepository>, AuthService<MockAuthRepository>) {
        let repo = Arc::new(MockAuthRepository::default());
        let mut cfg = AuthConfig::with_secret("secret");
        cfg.admin_emails = admins.iter().map(|s| s.to_string()).collect();
        (repo.clone(), AuthService::new(repo, cfg))
    }

    fn reg(email: &str) -> RegisterInput {
        RegisterInput { email: email.into(), name: "Ada".into(), password: "Passw0rd!".into() }
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_case_insensitively() {
        let (_, s) = svc(&[]);
        s.register(reg("ada@shop.test")).await.unwrap();
        let err = s.register(reg("ADA@shop.test")).await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict));
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let (_, s) = svc(&[]);
        let mut input = reg("ada@shop.test");
        input.password = "short".into();
        assert!(matches!(s.register(input).await, Err(AuthError::Validation(_))));
    }

    #[tokio::test]
    async fn admin_emails_become_platform_admins() {
        let (_, s) = svc(&["root@shop.test"]);
        assert!(s.register(reg("Root@Shop.test")).await.unwrap().is_admin);
        assert!(!s.register(reg("ada@shop.test")).await.unwrap().is_admin);
    }

    #[tokio::test]
    async fn login_issues_verifiable_token() {
        let (_, s) = svc(&[]);
        let user = s.register(reg("ada@shop.test")).await.unwrap();
        let session = s.login(LoginInput { email: "ada@shop.test".into(), password: "Passw0rd!".into() }).await.unwrap();
        let claims = token::verify("secret", session.token.as_deref().unwrap()).unwrap();
        assert_eq!(claims.user_id().unwrap(), user.id);
        assert_eq!(session.expires_at, Some(claims.exp));
    }

    #[tokio::test]
    async fn wrong_password_and_disabled_user_fail() {
        let (repo, s) = svc(&[]);
        s.register(reg("ada@shop.test")).await.unwrap();
        let bad = s.login(LoginInput { email: "ada@shop.test".into(), password: "nope-nope".into() }).await;
        assert!(matches!(bad, Err(AuthError::Unauthorized)));

        repo.set_active("ada@shop.test", false);
        let disabled = s.login(LoginInput { email: "ada@shop.test".into(), password: "Passw0rd!".into() }).await;
        assert!(matches!(disabled, Err(AuthError::Disabled)));
    }
}
