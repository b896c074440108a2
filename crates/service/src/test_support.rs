#![cfg(test)]
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use migration::MigratorTrait;
use uuid::Uuid;

/// Fresh migrated in-memory database. A single pooled connection keeps every
/// query on the same SQLite memory instance.
pub async fn get_db() -> Result<DatabaseConnection, anyhow::Error> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn seed_user(db: &DatabaseConnection, email: &str) -> Uuid {
    models::user::create(db, email, "Test User", false).await.unwrap().id
}

pub fn actor(user_id: Uuid) -> crate::access::Actor {
    crate::access::Actor { user_id, is_admin: false }
}

pub fn platform_admin() -> crate::access::Actor {
    crate::access::Actor { user_id: Uuid::new_v4(), is_admin: true }
}
