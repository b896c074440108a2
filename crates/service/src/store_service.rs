use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use models::plan::PlanLimits;
use models::status::{StoreRole, StoreStatus};
use models::{product, store, store_member};

use crate::access::{authorize, Actor, Permission};
use crate::errors::ServiceError;
use crate::subscription_service::{self, orders_in_period};
use crate::{Page, Pagination};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateStore {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

impl CreateStore {
    pub fn named(name: &str) -> Self { Self {
        name: name.to_string(), ..Default::default() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStore {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub currency: Option<String>,
}

/// A store together with the caller's role in it.
#[derive(Debug, Clone, Serialize)]
pub struct StoreWithRole {
    #[serde(flatten)]
    pub store: store::Model,
    pub role: Option<StoreRole>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreUsage {
    pub products: u64,
    pub orders_this_period: u64,
    pub period_start: sea_orm::prelude::DateTimeWithTimeZone,
    pub plan: Option<String>,
    pub limits: PlanLimits,
}

/// Create a store; the caller becomes its owner in the same transaction.
#[instrument(skip(db, input), fields(name = %input.name))]
pub async fn create(db: &DatabaseConnection, actor: Actor, input: CreateStore) -> Result<StoreWithRole, ServiceError> {
    let slug = match input.slug {
        Some(s) => s.trim().to_string(),
        None => store::slugify(&input.name),
    };
    let currency = input
        .currency
        .map(|c| c.trim().to_string())
        .unwrap_or_else(|| store::DEFAULT_CURRENCY.to_string());
    let description = input.description.filter(|d| !d.trim().is_empty());
    let am = store::new_active_model(actor.user_id, &input.name, &slug, description, &currency)?;

    let txn = db.begin().await?;
    let created = am.insert(&txn).await?;
    store_member::create(&txn, created.id, actor.user_id, StoreRole::Owner).await?;
    txn.commit().await?;

    info!(store_id = %created.id, owner_id = %actor.user_id, slug = %created.slug, "store_created");
    Ok(StoreWithRole { store: created, role: Some(StoreRole::Owner) })
}

/// A store open to shoppers. Missing and suspended stores both read as not found.
pub async fn find_open<C: ConnectionTrait>(db: &C, store_id: Uuid) -> Result<store::Model, ServiceError> {
    store::Entity::find_by_id(store_id)
        .one(db)
        .await?
        .filter(store::Model::is_active)
        .ok_or_else(|| ServiceError::not_found("store"))
}

/// Stores the caller is a member of, newest membership first.
pub async fn list_mine(db: &DatabaseConnection, actor: Actor, opts: Pagination) -> Result<Page<StoreWithRole>, ServiceError> {
    let (page_idx, per_page) = opts.normalize();
    let paginator = store_member::Entity::find()
        .filter(store_member::Column::UserId.eq(actor.user_id))
        .order_by_desc(store_member::Column::CreatedAt)
        .find_also_related(store::Entity)
        .paginate(db, per_page);
    let total = paginator.num_items().await?;
    let rows = paginator.fetch_page(page_idx).await?;
    let items = rows
        .into_iter()
        .filter_map(|(m, s)| s.map(|store| StoreWithRole { store, role: Some(m.role) }))
        .collect();
    Ok(Page::new(items, total, opts))
}

pub async fn get(db: &DatabaseConnection, actor: Actor, store_id: Uuid) -> Result<StoreWithRole, ServiceError> {
    let access = authorize(db, store_id, actor, Permission::ViewStore).await?;
    Ok(StoreWithRole { store: access.store, role: access.role })
}

#[instrument(skip(db, input))]
pub async fn update(db: &DatabaseConnection, actor: Actor, store_id: Uuid, input: UpdateStore) -> Result<store::Model, ServiceError> {
    let access = authorize(db, store_id, actor, Permission::ManageStore).await?;
    let mut am: store::ActiveModel = access.store.into();
    if let Some(name) = input.name {
        store::validate_name(&name)?;
        am.name = Set(name.trim().to_string());
    }
    if let Some(slug) = input.slug {
        let slug = slug.trim().to_string();
        store::validate_slug(&slug)?;
        am.slug = Set(slug);
    }
    if let Some(desc) = input.description {
        am.description = Set(Some(desc).filter(|d| !d.trim().is_empty()));
    }
    if let Some(currency) = input.currency {
        let currency = currency.trim().to_string();
        store::validate_currency(&currency)?;
        am.currency = Set(currency);
    }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(store_id = %updated.id, "store_updated");
    Ok(updated)
}

/// Hard delete; catalog, carts, orders and billing rows cascade.
#[instrument(skip(db))]
pub async fn delete(db: &DatabaseConnection, actor: Actor, store_id: Uuid) -> Result<(), ServiceError> {
    authorize(db, store_id, actor, Permission::DeleteStore).await?;
    store::Entity::delete_by_id(store_id).exec(db).await?;
    info!(store_id = %store_id, "store_deleted");
    Ok(())
}

/// Platform admin only.
#[instrument(skip(db))]
pub async fn set_status(db: &DatabaseConnection, actor: Actor, store_id: Uuid, status: StoreStatus) -> Result<store::Model, ServiceError> {
    if !actor.is_admin {
        return Err(ServiceError::Forbidden("platform admin only".into()));
    }
    let found = store::Entity::find_by_id(store_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("store"))?;
    let mut am: store::ActiveModel = found.into();
    am.status = Set(status);
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(store_id = %store_id, status = ?status, "store_status_changed");
    Ok(updated)
}

pub async fn usage(db: &DatabaseConnection, actor: Actor, store_id: Uuid) -> Result<StoreUsage, ServiceError> {
    authorize(db, store_id, actor, Permission::ViewStore).await?;
    let effective = subscription_service::effective_plan(db, store_id).await?;
    let period_start = effective.period_start(Utc::now().into());
    let products = product::Entity::find()
        .filter(product::Column::StoreId.eq(store_id))
        .count(db)
        .await?;
    let orders_this_period = orders_in_period(db, store_id, period_start).await?;
    Ok(StoreUsage {
        products,
        orders_this_period,
        period_start,
        plan: effective.plan.map(|p| p.name),
        limits: effective.limits,
    })
}
