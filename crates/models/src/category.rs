use sea_orm::{entity::prelude::*, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{errors, store};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "category")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub store_id: Uuid,
    pub name: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Store }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Store => Entity::belongs_to(store::Entity).from(Column::StoreId).to(store::Column::Id).into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_name(name: &str) -> Result<(), errors::ModelError> {
    let n = name.trim();
    if n.is_empty() { return Err(errors::ModelError::Validation("category name required".into())); }
    if n.chars().count() > 128 { return Err(errors::ModelError::Validation("category name too long (<=128)".into())); }
    Ok(())
}

pub fn new_active_model(store_id: Uuid, name: &str) -> Result<ActiveModel, errors::ModelError> {
    validate_name(name)?;
    Ok(ActiveModel {
        id: Set(Uuid::new_v4()),
        store_id: Set(store_id),
        name: Set(name.trim().to_string()),
        created_at: Set(Utc::now().into()),
    })
}
