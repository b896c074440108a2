use sea_orm::{entity::prelude::*, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{category, errors, store};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub store_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    /// Minor currency units of the store's currency.
    pub price: i64,
    pub stock: i32,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Store, Category }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Store => Entity::belongs_to(store::Entity).from(Column::StoreId).to(store::Column::Id).into(),
            Relation::Category => Entity::belongs_to(category::Entity).from(Column::CategoryId).to(category::Column::Id).into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_name(name: &str) -> Result<(), errors::ModelError> {
    let n = name.trim();
    if n.is_empty() { return Err(errors::ModelError::Validation("product name required".into())); }
    if n.chars().count() > 255 { return Err(errors::ModelError::Validation("product name too long (<=255)".into())); }
    Ok(())
}

pub fn validate_sku(sku: &str) -> Result<(), errors::ModelError> {
    let ok = !sku.is_empty() && sku.len() <= 64 && sku.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !ok { return Err(errors::ModelError::Validation("sku must be 1-64 chars of [A-Za-z0-9_-]".into())); }
    Ok(())
}

/// Upper bound on any catalog or plan price, in minor units.
pub const MAX_PRICE: i64 = 1_000_000_000_000;

pub fn validate_price(price: i64) -> Result<(), errors::ModelError> {
    if !(0..=MAX_PRICE).contains(&price) {
        return Err(errors::ModelError::Validation(format!("price must be within 0..={MAX_PRICE}")));
    }
    Ok(())
}

pub fn validate_stock(stock: i32) -> Result<(), errors::ModelError> {
    if stock < 0 { return Err(errors::ModelError::Validation("stock must be >= 0".into())); }
    Ok(())
}

/// Fields accepted when creating a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    pub price: i64,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool { true }

impl NewProduct {
    pub fn validate(&self) -> Result<(), errors::ModelError> {
        validate_name(&self.name)?;
        if let Some(sku) = &self.sku { validate_sku(sku)?; }
        validate_price(self.price)?;
        validate_stock(self.stock)?;
        Ok(())
    }

    pub fn into_active_model(self, store_id: Uuid) -> Result<ActiveModel, errors::ModelError> {
        self.validate()?;
        let now = Utc::now().into();
        Ok(ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            category_id: Set(self.category_id),
            name: Set(self.name.trim().to_string()),
            description: Set(self.description),
            sku: Set(self.sku),
            price: Set(self.price),
            stock: Set(self.stock),
            is_active: Set(self.is_active),
            created_at: Set(now),
            updated_at: Set(now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_product_validation() {
        let ok = NewProduct { name: "Pagne wax".into(), price: 12_000, stock: 3, is_active: true, ..Default::default() };
        assert!(ok.validate().is_ok());

        let neg = NewProduct { price: -1, ..ok.clone() };
        assert!(neg.validate().is_err());

        let huge = NewProduct { price: 1 << 62, ..ok.clone() };
        assert!(huge.validate().is_err());
        assert!(NewProduct { price: MAX_PRICE, ..ok.clone() }.validate().is_ok());

        let bad_sku = NewProduct { sku: Some("has space".into()), ..ok.clone() };
        assert!(bad_sku.validate().is_err());

        let blank = NewProduct { name: "   ".into(), ..ok };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn new_product_defaults_from_json() {
        let p: NewProduct = serde_json::from_str(r#"{"name":"Savon","price":500}"#).unwrap();
        assert!(p.is_active);
        assert_eq!(p.stock, 0);
        assert!(p.category_id.is_none());
    }
}
