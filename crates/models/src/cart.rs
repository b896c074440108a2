use sea_orm::{entity::prelude::*, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{cart_item, store, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cart")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub store_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { User, Store, Items }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(user::Entity).from(Column::UserId).to(user::Column::Id).into(),
            Relation::Store => Entity::belongs_to(store::Entity).from(Column::StoreId).to(store::Column::Id).into(),
            Relation::Items => Entity::has_many(cart_item::Entity).into(),
        }
    }
}

impl Related<cart_item::Entity> for Entity {
    fn to() -> RelationDef { Relation::Items.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn new_active_model(user_id: Uuid, store_id: Uuid) -> ActiveModel {
    let now = Utc::now().into();
    ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        store_id: Set(store_id),
        created_at: Set(now),
        updated_at: Set(now),
    }
}
