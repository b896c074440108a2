//! Migrator registering table migrations in foreign-key dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20240301_000001_create_user;
mod m20240301_000002_create_user_credentials;
mod m20240301_000003_create_store;
mod m20240301_000004_create_store_member;
mod m20240301_000005_create_plan;
mod m20240301_000006_create_subscription;
mod m20240301_000007_create_category;
mod m20240301_000008_create_product;
mod m20240301_000009_create_cart;
mod m20240301_000010_create_orders;
mod m20240301_000011_create_invoice;
mod m20240301_000012_create_payment;
mod m20240301_000099_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_user::Migration),
            Box::new(m20240301_000002_create_user_credentials::Migration),
            Box::new(m20240301_000003_create_store::Migration),
            Box::new(m20240301_000004_create_store_member::Migration),
            Box::new(m20240301_000005_create_plan::Migration),
            Box::new(m20240301_000006_create_subscription::Migration),
            Box::new(m20240301_000007_create_category::Migration),
            Box::new(m20240301_000008_create_product::Migration),
            Box::new(m20240301_000009_create_cart::Migration),
            Box::new(m20240301_000010_create_orders::Migration),
            Box::new(m20240301_000011_create_invoice::Migration),
            Box::new(m20240301_000012_create_payment::Migration),
            // Indexes should always be applied last
            Box::new(m20240301_000099_add_indexes::Migration),
        ]
    }
}
