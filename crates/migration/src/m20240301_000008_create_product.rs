//! Create `product` table. Prices are integer minor currency units.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Product::Table)
                    .if_not_exists()
                    .col(uuid(Product::Id).primary_key())
                    .col(uuid(Product::StoreId).not_null())
                    .col(ColumnDef::new(Product::CategoryId).uuid().null())
                    .col(string_len(Product::Name, 255).not_null())
                    .col(ColumnDef::new(Product::Description).text().null())
                    .col(ColumnDef::new(Product::Sku).string_len(64).null())
                    .col(big_integer(Product::Price).not_null())
                    .col(integer(Product::Stock).not_null())
                    .col(boolean(Product::IsActive).not_null())
                    .col(timestamp_with_time_zone(Product::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Product::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_store")
                            .from(Product::Table, Product::StoreId)
                            .to(Store::Table, Store::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_category")
                            .from(Product::Table, Product::CategoryId)
                            .to(Category::Table, Category::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Product::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Product {
    Table,
    Id,
    StoreId,
    CategoryId,
    Name,
    Description,
    Sku,
    Price,
    Stock,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Store { Table, Id }

#[derive(DeriveIden)]
enum Category { Table, Id }
