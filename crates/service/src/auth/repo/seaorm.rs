use sea_orm::{DatabaseConnection, EntityTrait, TransactionTrait};
use uuid::Uuid;

use crate::auth::domain::{AuthUser, Credentials};
use crate::auth::errors::AuthError;
use crate::auth::repository::AuthRepository;

pub struct SeaOrmAuthRepository {
    pub db: DatabaseConnection,
}

fn to_auth_user(u: models::user::Model) -> AuthUser {
    let active = u.is_active();
    AuthUser { id: u.id, email: u.email, name: u.name, is_admin: u.is_admin, active }
}

#[async_trait::async_trait]
impl AuthRepository for SeaOrmAuthRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
        let res = models::user::find_by_email(&self.db, email).await?;
        Ok(res.map(to_auth_user))
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError> {
        let res = models::user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(res.map(to_auth_user))
    }

    async fn create_user_with_password(
        &self,
        email: &str,
        name: &str,
        is_admin: bool,
        password_hash: String,
        password_algorithm: &str,
    ) -> Result<AuthUser, AuthError> {
        let txn = self.db.begin().await.map_err(|e| AuthError::Repository(e.to_string()))?;
        let created = models::user::create(&txn, email, name, is_admin).await?;
        models::user_credentials::upsert_password(&txn, created.id, password_hash, password_algorithm).await?;
        txn.commit().await.map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(to_auth_user(created))
    }

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
        let res = models::user_credentials::find_by_user(&self.db, user_id).await?;
        Ok(res.map(|c| Credentials { user_id: c.user_id, password_hash: c.password_hash, password_algorithm: c.password_algorithm }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    #[tokio::test]
    async fn failed_credential_write_leaves_no_user() {
        let db = get_db().await.unwrap();
        let repo = SeaOrmAuthRepository { db };

        let err = repo.create_user_with_password("ada@shop.test", "Ada", false, " ".into(), "argon2").await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
        assert!(repo.find_user_by_email("ada@shop.test").await.unwrap().is_none());

        let user = repo.create_user_with_password("ada@shop.test", "Ada", false, "hash".into(), "argon2").await.unwrap();
        let creds = repo.get_credentials(user.id).await.unwrap().unwrap();
        assert_eq!(creds.password_hash, "hash");
    }
}
