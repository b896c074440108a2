use sea_orm::{entity::prelude::*, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "plan")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub price: i64,
    pub currency: String,
    pub interval_days: i32,
    pub max_products: Option<i32>,
    pub max_orders: Option<i32>,
    pub max_storage_mb: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Feature limits a store operates under. `None` means unlimited.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub max_products: Option<i32>,
    pub max_orders: Option<i32>,
    pub max_storage_mb: Option<i32>,
}

impl PlanLimits {
    /// Limits applied to stores without an active subscription.
    pub const FREE: PlanLimits = PlanLimits { max_products: Some(10), max_orders: Some(50), max_storage_mb: Some(100) };

    /// Whether one more item fits under `limit` given `current` usage.
    pub fn allows(limit: Option<i32>, current: u64) -> bool {
        match limit {
            None => true,
            Some(max) => current < max.max(0) as u64,
        }
    }
}

impl Model {
    pub fn limits(&self) -> PlanLimits {
        PlanLimits { max_products: self.max_products, max_orders: self.max_orders, max_storage_mb: self.max_storage_mb }
    }

    pub fn is_free(&self) -> bool {
        self.price == 0
    }
}

pub fn validate_interval_days(days: i32) -> Result<(), errors::ModelError> {
    if !(1..=3660).contains(&days) {
        return Err(errors::ModelError::Validation("interval_days must be within 1..=3660".into()));
    }
    Ok(())
}

pub fn validate_limit(field: &str, v: Option<i32>) -> Result<(), errors::ModelError> {
    if matches!(v, Some(n) if n < 0) {
        return Err(errors::ModelError::Validation(format!("{field} must be >= 0 or null")));
    }
    Ok(())
}

pub fn validate_price(price: i64) -> Result<(), errors::ModelError> {
    crate::product::validate_price(price)
}

pub fn new_active_model(
    name: &str,
    slug: &str,
    price: i64,
    currency: &str,
    interval_days: i32,
    limits: PlanLimits,
    is_active: bool,
) -> Result<ActiveModel, errors::ModelError> {
    crate::user::validate_name(name)?;
    crate::store::validate_slug(slug)?;
    crate::store::validate_currency(currency)?;
    validate_price(price)?;
    validate_interval_days(interval_days)?;
    validate_limit("max_products", limits.max_products)?;
    validate_limit("max_orders", limits.max_orders)?;
    validate_limit("max_storage_mb", limits.max_storage_mb)?;
    let now = Utc::now().into();
    Ok(ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.trim().to_string()),
        slug: Set(slug.to_string()),
        price: Set(price),
        currency: Set(currency.to_string()),
        interval_days: Set(interval_days),
        max_products: Set(limits.max_products),
        max_orders: Set(limits.max_orders),
        max_storage_mb: Set(limits.max_storage_mb),
        is_active: Set(is_active),
        created_at: Set(now),
        updated_at: Set(now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_checks() {
        assert!(PlanLimits::allows(None, u64::MAX));
        assert!(PlanLimits::allows(Some(10), 9));
        assert!(!PlanLimits::allows(Some(10), 10));
        assert!(!PlanLimits::allows(Some(0), 0));
    }

    #[test]
    fn rejects_out_of_range_prices() {
        assert!(validate_price(-1).is_err());
        assert!(validate_price(crate::product::MAX_PRICE + 1).is_err());
        assert!(validate_price(0).is_ok());
    }

    #[test]
    fn rejects_negative_limits() {
        assert!(validate_limit("max_orders", Some(-1)).is_err());
        assert!(validate_limit("max_orders", None).is_ok());
    }
}
