use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use models::plan::{self, PlanLimits};
use crate::access::Actor;
use crate::errors::ServiceError;

/// Plan fields accepted on create and full update.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanInput {
    pub name: String,
    pub slug: String,
    pub price: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_interval_days")]
    pub interval_days: i32,
    #[serde(default)]
    pub max_products: Option<i32>,
    #[serde(default)]
    pub max_orders: Option<i32>,
    #[serde(default)]
    pub max_storage_mb: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_currency() -> String { models::store::DEFAULT_CURRENCY.to_string() }
fn default_interval_days() -> i32 { 30 }
fn default_true() -> bool { true }

impl PlanInput {
    fn limits(&self) -> PlanLimits {
        PlanLimits { max_products: self.max_products, max_orders: self.max_orders, max_storage_mb: self.max_storage_mb }
    }
}

fn require_admin(actor: Actor) -> Result<(), ServiceError> {
    if !actor.is_admin {
        return Err(ServiceError::Forbidden("platform admin only".into()));
    }
    Ok(())
}

/// Active plans, cheapest first.
pub async fn list_active(db: &DatabaseConnection) -> Result<Vec<plan::Model>, ServiceError> {
    Ok(plan::Entity::find()
        .filter(plan::Column::IsActive.eq(true))
        .order_by_asc(plan::Column::Price)
        .all(db)
        .await?)
}

pub async fn get(db: &DatabaseConnection, id: Uuid) -> Result<plan::Model, ServiceError> {
    plan::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("plan"))
}

#[instrument(skip(db, input), fields(slug = %input.slug))]
pub async fn create(db: &DatabaseConnection, actor: Actor, input: PlanInput) -> Result<plan::Model, ServiceError> {
    require_admin(actor)?;
    let am = plan::new_active_model(
        &input.name,
        &input.slug,
        input.price,
        &input.currency,
        input.interval_days,
        input.limits(),
        input.is_active,
    )?;
    let created = am.insert(db).await?;
    info!(plan_id = %created.id, "plan_created");
    Ok(created)
}

#[instrument(skip(db, input))]
pub async fn update(db: &DatabaseConnection, actor: Actor, id: Uuid, input: PlanInput) -> Result<plan::Model, ServiceError> {
    require_admin(actor)?;
    let existing = get(db, id).await?;
    // Reuse the constructor for validation, then copy the fields onto the stored row.
    let limits = input.limits();
    plan::new_active_model(&input.name, &input.slug, input.price, &input.currency, input.interval_days, limits, input.is_active)?;
    let mut am: plan::ActiveModel = existing.into();
    am.name = Set(input.name.trim().to_string());
    am.slug = Set(input.slug);
    am.price = Set(input.price);
    am.currency = Set(input.currency);
    am.interval_days = Set(input.interval_days);
    am.max_products = Set(limits.max_products);
    am.max_orders = Set(limits.max_orders);
    am.max_storage_mb = Set(limits.max_storage_mb);
    am.is_active = Set(input.is_active);
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(plan_id = %updated.id, "plan_updated");
    Ok(updated)
}

#[cfg(test)]
pub(crate) fn input(slug: &str, price: i64, max_products: Option<i32>) -> PlanInput {
    PlanInput {
        name: format!("Plan {slug}"),
        slug: slug.to_string(),
        price,
        currency: "XAF".into(),
        interval_days: 30,
        max_products,
        max_orders: None,
        max_storage_mb: None,
        is_active: true,
    }
}
