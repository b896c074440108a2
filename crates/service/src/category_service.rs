use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::{info, instrument};
use uuid::Uuid;

use models::category;

use crate::access::{authorize, Actor, Permission};
use crate::errors::ServiceError;
use crate::store_service::find_open;

/// Public listing, alphabetical.
pub async fn list(db: &DatabaseConnection, store_id: Uuid) -> Result<Vec<category::Model>, ServiceError> {
    find_open(db, store_id).await?;
    Ok(category::Entity::find()
        .filter(category::Column::StoreId.eq(store_id))
        .order_by_asc(category::Column::Name)
        .all(db)
        .await?)
}

async fn find_in_store(db: &DatabaseConnection, store_id: Uuid, category_id: Uuid) -> Result<category::Model, ServiceError> {
    category::Entity::find_by_id(category_id)
        .one(db)
        .await?
        .filter(|c| c.store_id == store_id)
        .ok_or_else(|| ServiceError::not_found("category"))
}

#[instrument(skip(db))]
pub async fn create(db: &DatabaseConnection, actor: Actor, store_id: Uuid, name: &str) -> Result<category::Model, ServiceError> {
    authorize(db, store_id, actor, Permission::ManageCatalog).await?;
    let created = category::new_active_model(store_id, name)?.insert(db).await?;
    info!(store_id = %store_id, category_id = %created.id, "category_created");
    Ok(created)
}

#[instrument(skip(db))]
pub async fn rename(db: &DatabaseConnection, actor: Actor, store_id: Uuid, category_id: Uuid, name: &str) -> Result<category::Model, ServiceError> {
    authorize(db, store_id, actor, Permission::ManageCatalog).await?;
    category::validate_name(name)?;
    let mut am: category::ActiveModel = find_in_store(db, store_id, category_id).await?.into();
    am.name = Set(name.trim().to_string());
    Ok(am.update(db).await?)
}

/// Products in the category are kept and lose their category.
#[instrument(skip(db))]
pub async fn delete(db: &DatabaseConnection, actor: Actor, store_id: Uuid, category_id: Uuid) -> Result<(), ServiceError> {
    authorize(db, store_id, actor, Permission::ManageCatalog).await?;
    let found = find_in_store(db, store_id, category_id).await?;
    category::Entity::delete_by_id(found.id).exec(db).await?;
    info!(store_id = %store_id, category_id = %category_id, "category_deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store_service::{self, CreateStore};
    use crate::test_support::{actor, get_db, seed_user};
    use models::status::StoreRole;

    #[tokio::test]
    async fn category_crud() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let owner = actor(seed_user(&db, "owner@shop.test").await);
        let store = store_service::create(&db, owner, CreateStore::named("Cats")).await?.store;

        let shoes = create(&db, owner, store.id, "Shoes").await?;
        create(&db, owner, store.id, "Bags").await?;
        assert!(matches!(create(&db, owner, store.id, "Shoes").await, Err(ServiceError::Conflict(_))));

        let names: Vec<_> = list(&db, store.id).await?.into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Bags", "Shoes"]);

        let renamed = rename(&db, owner, store.id, shoes.id, "Sandals").await?;
        assert_eq!(renamed.name, "Sandals");
        delete(&db, owner, store.id, shoes.id).await?;
        assert_eq!(list(&db, store.id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn staff_cannot_edit_catalog_and_ids_are_store_scoped() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let owner = actor(seed_user(&db, "owner@shop.test").await);
        let staff = seed_user(&db, "staff@shop.test").await;
        let a = store_service::create(&db, owner, CreateStore::named("Store A")).await?.store;
        let b = store_service::create(&db, owner, CreateStore::named("Store B")).await?.store;
        models::store_member::create(&db, a.id, staff, StoreRole::Staff).await?;

        assert!(matches!(create(&db, actor(staff), a.id, "Hats").await, Err(ServiceError::Forbidden(_))));
        let hats = create(&db, owner, a.id, "Hats").await?;
        assert!(matches!(delete(&db, owner, b.id, hats.id).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }
}
