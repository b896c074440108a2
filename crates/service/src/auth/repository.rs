use async_trait::async_trait;
use uuid::Uuid;

use super::domain::{AuthUser, Credentials};
use super::errors::AuthError;

/// Repository abstraction for auth-related persistence.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError>;
    /// Store the user row and its password hash together; neither exists without the other.
    async fn create_user_with_password(
        &self,
        email: &str,
        name: &str,
        is_admin: bool,
        password_hash: String,
        password_algorithm: &str,
    ) -> Result<AuthUser, AuthError>;

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Mutex, MutexGuard};

    #[derive(Default)]
    pub struct MockAuthRepository {
        users: Mutex<HashMap<String, AuthUser>>, // key: lower-cased email
        creds: Mutex<HashMap<Uuid, Credentials>>, // key: user_id
    }

    fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, AuthError> {
        m.lock().map_err(|e| AuthError::Repository(e.to_string()))
    }

    impl MockAuthRepository {
        /// Flip a user's active flag, simulating an admin disabling the account.
        pub fn set_active(&self, email: &str, active: bool) {
            if let Ok(mut users) = self.users.lock() {
                if let Some(u) = users.get_mut(&email.to_lowercase()) {
                    u.active = active;
                }
            }
        }
    }

    #[async_trait]
    impl AuthRepository for MockAuthRepository {
        async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
            Ok(lock(&self.users)?.get(&email.to_lowercase()).cloned())
        }

        async fn find_user_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError> {
            Ok(lock(&self.users)?.values().find(|u| u.id == id).cloned())
        }

        async fn create_user_with_password(
            &self,
            email: &str,
            name: &str,
            is_admin: bool,
            password_hash: String,
            password_algorithm: &str,
        ) -> Result<AuthUser, AuthError> {
            if password_hash.trim().is_empty() {
                return Err(AuthError::Validation("password hash required".into()));
            }
            let mut users = lock(&self.users)?;
            let key = email.to_lowercase();
            if users.contains_key(&key) {
                return Err(AuthError::Conflict);
            }
            let user = AuthUser { id: Uuid::new_v4(), email: key.clone(), name: name.to_string(), is_admin, active: true };
            let c = Credentials { user_id: user.id, password_hash, password_algorithm: password_algorithm.to_string() };
            lock(&self.creds)?.insert(user.id, c);
            users.insert(key, user.clone());
            Ok(user)
        }

        async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
            Ok(lock(&self.creds)?.get(&user_id).cloned())
        }
    }
}
