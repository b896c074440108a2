use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Select, Set,
};
use serde::{Deserialize, Deserializer};
use tracing::{info, instrument};
use uuid::Uuid;

use models::plan::PlanLimits;
use models::product::{self, NewProduct};
use models::category;

use crate::access::{authorize, Actor, Permission};
use crate::errors::ServiceError;
use crate::store_service::find_open;
use crate::subscription_service::effective_plan;
use crate::{fetch_page, Page, Pagination};

/// Listing filters shared by the public and back-office catalogs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    #[serde(default)]
    pub category_id: Option<Uuid>,
    /// Substring match on the product name.
    #[serde(default)]
    pub q: Option<String>,
}

/// Partial update. Nullable fields distinguish "absent" from an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub sku: Option<Option<String>>,
    pub price: Option<i64>,
    pub stock: Option<i32>,
    #[serde(default, deserialize_with = "present")]
    pub category_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
}

fn present<'de, T, D>(d: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(d).map(Some)
}

fn filtered(store_id: Uuid, filter: &ProductFilter) -> Select<product::Entity> {
    let mut q = product::Entity::find().filter(product::Column::StoreId.eq(store_id));
    if let Some(cid) = filter.category_id {
        q = q.filter(product::Column::CategoryId.eq(cid));
    }
    if let Some(term) = filter.q.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        q = q.filter(product::Column::Name.contains(term));
    }
    q.order_by_asc(product::Column::Name)
}

async fn check_category(db: &DatabaseConnection, store_id: Uuid, category_id: Option<Uuid>) -> Result<(), ServiceError> {
    let Some(cid) = category_id else { return Ok(()) };
    let belongs = category::Entity::find_by_id(cid)
        .one(db)
        .await?
        .is_some_and(|c| c.store_id == store_id);
    if !belongs {
        return Err(ServiceError::Validation("category does not belong to this store".into()));
    }
    Ok(())
}

async fn find_in_store(db: &DatabaseConnection, store_id: Uuid, product_id: Uuid) -> Result<product::Model, ServiceError> {
    product::Entity::find_by_id(product_id)
        .one(db)
        .await?
        .filter(|p| p.store_id == store_id)
        .ok_or_else(|| ServiceError::not_found("product"))
}

/// Active products of an open store.
pub async fn list_public(db: &DatabaseConnection, store_id: Uuid, filter: ProductFilter, opts: Pagination) -> Result<Page<product::Model>, ServiceError> {
    find_open(db, store_id).await?;
    let q = filtered(store_id, &filter).filter(product::Column::IsActive.eq(true));
    fetch_page(db, q, opts).await
}

pub async fn get_public(db: &DatabaseConnection, store_id: Uuid, product_id: Uuid) -> Result<product::Model, ServiceError> {
    find_open(db, store_id).await?;
    let found = find_in_store(db, store_id, product_id).await?;
    if !found.is_active {
        return Err(ServiceError::not_found("product"));
    }
    Ok(found)
}

/// Back-office listing, inactive products included.
pub async fn list_admin(db: &DatabaseConnection, actor: Actor, store_id: Uuid, filter: ProductFilter, opts: Pagination) -> Result<Page<product::Model>, ServiceError> {
    authorize(db, store_id, actor, Permission::ViewStore).await?;
    fetch_page(db, filtered(store_id, &filter), opts).await
}

#[instrument(skip(db, input), fields(name = %input.name))]
pub async fn create(db: &DatabaseConnection, actor: Actor, store_id: Uuid, input: NewProduct) -> Result<product::Model, ServiceError> {
    authorize(db, store_id, actor, Permission::ManageCatalog).await?;
    input.validate()?;
    check_category(db, store_id, input.category_id).await?;

    let limits = effective_plan(db, store_id).await?.limits;
    let current = product::Entity::find()
        .filter(product::Column::StoreId.eq(store_id))
        .count(db)
        .await?;
    if !PlanLimits::allows(limits.max_products, current) {
        return Err(ServiceError::LimitExceeded(format!(
            "product limit of {} reached; upgrade the plan",
            limits.max_products.unwrap_or_default()
        )));
    }

    let created = input.into_active_model(store_id)?.insert(db).await?;
    info!(store_id = %store_id, product_id = %created.id, "product_created");
    Ok(created)
}

#[instrument(skip(db, input))]
pub async fn update(db: &DatabaseConnection, actor: Actor, store_id: Uuid, product_id: Uuid, input: ProductUpdate) -> Result<product::Model, ServiceError> {
    authorize(db, store_id, actor, Permission::ManageCatalog).await?;
    let mut am: product::ActiveModel = find_in_store(db, store_id, product_id).await?.into();
    if let Some(name) = input.name {
        product::validate_name(&name)?;
        am.name = Set(name.trim().to_string());
    }
    if let Some(description) = input.description {
        am.description = Set(description);
    }
    if let Some(sku) = input.sku {
        if let Some(s) = &sku {
            product::validate_sku(s)?;
        }
        am.sku = Set(sku);
    }
    if let Some(price) = input.price {
        product::validate_price(price)?;
        am.price = Set(price);
    }
    if let Some(stock) = input.stock {
        product::validate_stock(stock)?;
        am.stock = Set(stock);
    }
    if let Some(category_id) = input.category_id {
        check_category(db, store_id, category_id).await?;
        am.category_id = Set(category_id);
    }
    if let Some(active) = input.is_active {
        am.is_active = Set(active);
    }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(store_id = %store_id, product_id = %product_id, "product_updated");
    Ok(updated)
}

/// Past order lines keep their snapshot; cart lines referencing the product go with it.
#[instrument(skip(db))]
pub async fn delete(db: &DatabaseConnection, actor: Actor, store_id: Uuid, product_id: Uuid) -> Result<(), ServiceError> {
    authorize(db, store_id, actor, Permission::ManageCatalog).await?;
    let found = find_in_store(db, store_id, product_id).await?;
    product::Entity::delete_by_id(found.id).exec(db).await?;
    info!(store_id = %store_id, product_id = %product_id, "product_deleted");
    Ok(())
}

#[cfg(test)]
pub(crate) fn sample(name: &str, price: i64, stock: i32) -> NewProduct {
    NewProduct { name: name.into(), price, stock, is_active: true, ..Default::default() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category_service;
    use crate::store_service::{self, CreateStore};
    use crate::test_support::{actor, get_db, platform_admin, seed_user};
    use models::status::StoreStatus;

    #[tokio::test]
    async fn public_listing_hides_inactive_and_filters() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let owner = actor(seed_user(&db, "owner@shop.test").await);
        let store = store_service::create(&db, owner, CreateStore::named("Catalog")).await?.store;
        let fabrics = category_service::create(&db, owner, store.id, "Fabrics").await?;

        let wax = NewProduct { category_id: Some(fabrics.id), ..sample("Pagne wax", 12_000, 5) };
        create(&db, owner, store.id, wax).await?;
        create(&db, owner, store.id, sample("Savon noir", 500, 40)).await?;
        create(&db, owner, store.id, NewProduct { is_active: false, ..sample("Old stock", 100, 1) }).await?;

        let public = list_public(&db, store.id, ProductFilter::default(), Pagination::default()).await?;
        assert_eq!(public.total, 2);
        let admin = list_admin(&db, owner, store.id, ProductFilter::default(), Pagination::default()).await?;
        assert_eq!(admin.total, 3);

        let by_cat = ProductFilter { category_id: Some(fabrics.id), q: None };
        assert_eq!(list_public(&db, store.id, by_cat, Pagination::default()).await?.items[0].name, "Pagne wax");
        let by_name = ProductFilter { category_id: None, q: Some("Savon".into()) };
        assert_eq!(list_public(&db, store.id, by_name, Pagination::default()).await?.total, 1);

        let paged = list_public(&db, store.id, ProductFilter::default(), Pagination { page: 2, per_page: 1 }).await?;
        assert_eq!(paged.items.len(), 1);
        assert_eq!(paged.total_pages, 2);

        store_service::set_status(&db, platform_admin(), store.id, StoreStatus::Suspended).await?;
        let hidden = list_public(&db, store.id, ProductFilter::default(), Pagination::default()).await;
        assert!(matches!(hidden, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn free_plan_caps_product_count() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let owner = actor(seed_user(&db, "owner@shop.test").await);
        let store = store_service::create(&db, owner, CreateStore::named("Capped")).await?.store;
        let cap = PlanLimits::FREE.max_products.unwrap();
        for i in 0..cap {
            create(&db, owner, store.id, sample(&format!("Item {i}"), 100, 1)).await?;
        }
        let over = create(&db, owner, store.id, sample("One too many", 100, 1)).await;
        assert!(matches!(over, Err(ServiceError::LimitExceeded(_))));
        Ok(())
    }

    #[tokio::test]
    async fn oversized_prices_are_rejected() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let owner = actor(seed_user(&db, "owner@shop.test").await);
        let store = store_service::create(&db, owner, CreateStore::named("Pricey")).await?.store;
        let huge = create(&db, owner, store.id, sample("Gold bar", 1 << 62, 5)).await;
        assert!(matches!(huge, Err(ServiceError::Validation(_))));

        let p = create(&db, owner, store.id, sample("Gold leaf", models::product::MAX_PRICE, 5)).await?;
        let bump = ProductUpdate { price: Some(models::product::MAX_PRICE + 1), ..Default::default() };
        assert!(matches!(update(&db, owner, store.id, p.id, bump).await, Err(ServiceError::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn update_validates_and_clears_fields() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let owner = actor(seed_user(&db, "owner@shop.test").await);
        let store = store_service::create(&db, owner, CreateStore::named("Edits")).await?.store;
        let other = store_service::create(&db, owner, CreateStore::named("Elsewhere")).await?.store;
        let foreign = category_service::create(&db, owner, other.id, "Foreign").await?;
        let p = create(&db, owner, store.id, NewProduct { sku: Some("SKU-1".into()), ..sample("Basket", 2_000, 3) }).await?;

        let patch: ProductUpdate = serde_json::from_str(r#"{"price": 2500, "sku": null}"#)?;
        let updated = update(&db, owner, store.id, p.id, patch).await?;
        assert_eq!(updated.price, 2_500);
        assert_eq!(updated.sku, None);
        assert_eq!(updated.stock, 3);

        let bad = ProductUpdate { category_id: Some(Some(foreign.id)), ..Default::default() };
        assert!(matches!(update(&db, owner, store.id, p.id, bad).await, Err(ServiceError::Validation(_))));
        let negative = ProductUpdate { stock: Some(-1), ..Default::default() };
        assert!(matches!(update(&db, owner, store.id, p.id, negative).await, Err(ServiceError::Validation(_))));

        delete(&db, owner, store.id, p.id).await?;
        assert!(matches!(get_public(&db, store.id, p.id).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }
}
