use sea_orm::entity::prelude::*;
use uuid::Uuid;
use serde::{Deserialize, Serialize};

use crate::{cart, errors, product};

pub const MAX_QUANTITY: i32 = 1000;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cart_item")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    /// Price captured when the item was last added.
    pub unit_price: i64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Cart, Product }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Cart => Entity::belongs_to(cart::Entity).from(Column::CartId).to(cart::Column::Id).into(),
            Relation::Product => Entity::belongs_to(product::Entity).from(Column::ProductId).to(product::Column::Id).into(),
        }
    }
}

impl Related<product::Entity> for Entity {
    fn to() -> RelationDef { Relation::Product.def() }
}

impl Related<cart::Entity> for Entity {
    fn to() -> RelationDef { Relation::Cart.def() }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn line_total(&self) -> Result<i64, errors::ModelError> {
        line_total(self.unit_price, self.quantity)
    }
}

/// `unit_price * quantity`, rejecting totals that do not fit in an `i64`.
pub fn line_total(unit_price: i64, quantity: i32) -> Result<i64, errors::ModelError> {
    unit_price
        .checked_mul(i64::from(quantity))
        .ok_or_else(|| errors::ModelError::Validation("line total out of range".into()))
}

/// Sum of line totals, rejecting overflow.
pub fn sum_totals<I: IntoIterator<Item = i64>>(totals: I) -> Result<i64, errors::ModelError> {
    totals.into_iter().try_fold(0i64, |acc, t| {
        acc.checked_add(t).ok_or_else(|| errors::ModelError::Validation("order total out of range".into()))
    })
}

pub fn validate_quantity(q: i32) -> Result<(), errors::ModelError> {
    if !(1..=MAX_QUANTITY).contains(&q) {
        return Err(errors::ModelError::Validation(format!("quantity must be within 1..={MAX_QUANTITY}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_reject_overflow() {
        assert_eq!(line_total(1_500, 3).unwrap(), 4_500);
        assert!(line_total(1 << 62, 2).is_err());
        assert_eq!(sum_totals([10, 20, 30]).unwrap(), 60);
        assert!(sum_totals([i64::MAX, 1]).is_err());
    }
}
