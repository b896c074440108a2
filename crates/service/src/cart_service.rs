//! One cart per (customer, store). Unit prices are refreshed from the product
//! on every add; checkout reprices from the catalog anyway.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use models::{cart, cart_item, product};

use crate::access::Actor;
use crate::errors::ServiceError;
use crate::store_service::find_open;

#[derive(Debug, Clone, Deserialize)]
pub struct AddItem {
    pub product_id: Uuid,
    #[serde(default = "one")]
    pub quantity: i32,
}

fn one() -> i32 { 1 }

#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub item_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub line_total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub cart_id: Option<Uuid>,
    pub store_id: Uuid,
    pub currency: String,
    pub items: Vec<CartLine>,
    pub subtotal: i64,
}

pub async fn find_cart<C: ConnectionTrait>(db: &C, user_id: Uuid, store_id: Uuid) -> Result<Option<cart::Model>, ServiceError> {
    Ok(cart::Entity::find()
        .filter(cart::Column::UserId.eq(user_id))
        .filter(cart::Column::StoreId.eq(store_id))
        .one(db)
        .await?)
}

/// Cart items with their products; items whose product vanished are skipped.
pub async fn load_items<C: ConnectionTrait>(db: &C, cart_id: Uuid) -> Result<Vec<(cart_item::Model, product::Model)>, ServiceError> {
    let rows = cart_item::Entity::find()
        .filter(cart_item::Column::CartId.eq(cart_id))
        .order_by_asc(cart_item::Column::CreatedAt)
        .find_also_related(product::Entity)
        .all(db)
        .await?;
    Ok(rows.into_iter().filter_map(|(i, p)| p.map(|p| (i, p))).collect())
}

async fn render(db: &DatabaseConnection, store_id: Uuid, currency: String, cart: Option<cart::Model>) -> Result<CartView, ServiceError> {
    let Some(cart) = cart else {
        return Ok(CartView { cart_id: None, store_id, currency, items: Vec::new(), subtotal: 0 });
    };
    let mut items = Vec::new();
    for (i, p) in load_items(db, cart.id).await? {
        items.push(CartLine {
            item_id: i.id,
            product_id: p.id,
            name: p.name,
            unit_price: i.unit_price,
            quantity: i.quantity,
            line_total: i.line_total()?,
        });
    }
    let subtotal = cart_item::sum_totals(items.iter().map(|l| l.line_total))?;
    Ok(CartView { cart_id: Some(cart.id), store_id, currency, items, subtotal })
}

fn ensure_stock(p: &product::Model, wanted: i32) -> Result<(), ServiceError> {
    if p.stock < wanted {
        return Err(ServiceError::Conflict(format!("only {} of '{}' left in stock", p.stock, p.name)));
    }
    Ok(())
}

async fn sellable(db: &DatabaseConnection, store_id: Uuid, product_id: Uuid) -> Result<product::Model, ServiceError> {
    product::Entity::find_by_id(product_id)
        .one(db)
        .await?
        .filter(|p| p.store_id == store_id && p.is_active)
        .ok_or_else(|| ServiceError::not_found("product"))
}

async fn own_item(db: &DatabaseConnection, actor: Actor, store_id: Uuid, item_id: Uuid) -> Result<cart_item::Model, ServiceError> {
    let cart = find_cart(db, actor.user_id, store_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("cart item"))?;
    cart_item::Entity::find_by_id(item_id)
        .one(db)
        .await?
        .filter(|i| i.cart_id == cart.id)
        .ok_or_else(|| ServiceError::not_found("cart item"))
}

pub async fn view(db: &DatabaseConnection, actor: Actor, store_id: Uuid) -> Result<CartView, ServiceError> {
    let store = find_open(db, store_id).await?;
    let cart = find_cart(db, actor.user_id, store_id).await?;
    render(db, store_id, store.currency, cart).await
}

/// Add a product, merging with an existing line for the same product.
#[instrument(skip(db, input), fields(product_id = %input.product_id, quantity = input.quantity))]
pub async fn add_item(db: &DatabaseConnection, actor: Actor, store_id: Uuid, input: AddItem) -> Result<CartView, ServiceError> {
    let store = find_open(db, store_id).await?;
    cart_item::validate_quantity(input.quantity)?;
    let p = sellable(db, store_id, input.product_id).await?;

    let cart = match find_cart(db, actor.user_id, store_id).await? {
        Some(c) => c,
        None => cart::new_active_model(actor.user_id, store_id).insert(db).await?,
    };
    let existing = cart_item::Entity::find()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .filter(cart_item::Column::ProductId.eq(p.id))
        .one(db)
        .await?;

    let now = Utc::now().into();
    match existing {
        Some(item) => {
            let merged = item.quantity + input.quantity;
            cart_item::validate_quantity(merged)?;
            ensure_stock(&p, merged)?;
            let mut am: cart_item::ActiveModel = item.into();
            am.quantity = Set(merged);
            am.unit_price = Set(p.price);
            am.updated_at = Set(now);
            am.update(db).await?;
        }
        None => {
            ensure_stock(&p, input.quantity)?;
            cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(p.id),
                quantity: Set(input.quantity),
                unit_price: Set(p.price),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(db)
            .await?;
        }
    }
    debug!(cart_id = %cart.id, "cart_item_added");
    render(db, store_id, store.currency, Some(cart)).await
}

/// Set a line's quantity; zero removes the line.
#[instrument(skip(db))]
pub async fn update_item(db: &DatabaseConnection, actor: Actor, store_id: Uuid, item_id: Uuid, quantity: i32) -> Result<CartView, ServiceError> {
    if quantity == 0 {
        return remove_item(db, actor, store_id, item_id).await;
    }
    let store = find_open(db, store_id).await?;
    cart_item::validate_quantity(quantity)?;
    let item = own_item(db, actor, store_id, item_id).await?;
    let p = sellable(db, store_id, item.product_id).await?;
    ensure_stock(&p, quantity)?;

    let mut am: cart_item::ActiveModel = item.into();
    am.quantity = Set(quantity);
    am.unit_price = Set(p.price);
    am.updated_at = Set(Utc::now().into());
    am.update(db).await?;
    let cart = find_cart(db, actor.user_id, store_id).await?;
    render(db, store_id, store.currency, cart).await
}

pub async fn remove_item(db: &DatabaseConnection, actor: Actor, store_id: Uuid, item_id: Uuid) -> Result<CartView, ServiceError> {
    let store = find_open(db, store_id).await?;
    let item = own_item(db, actor, store_id, item_id).await?;
    cart_item::Entity::delete_by_id(item.id).exec(db).await?;
    let cart = find_cart(db, actor.user_id, store_id).await?;
    render(db, store_id, store.currency, cart).await
}

pub async fn clear(db: &DatabaseConnection, actor: Actor, store_id: Uuid) -> Result<(), ServiceError> {
    if let Some(cart) = find_cart(db, actor.user_id, store_id).await? {
        empty(db, cart.id).await?;
    }
    Ok(())
}

pub async fn empty<C: ConnectionTrait>(db: &C, cart_id: Uuid) -> Result<(), ServiceError> {
    cart_item::Entity::delete_many()
        .filter(cart_item::Column::CartId.eq(cart_id))
        .exec(db)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product_service::{self, sample};
    use crate::store_service::{self, CreateStore};
    use crate::test_support::{actor, get_db, seed_user};

    #[tokio::test]
    async fn add_merges_and_totals() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let owner = actor(seed_user(&db, "owner@shop.test").await);
        let buyer = actor(seed_user(&db, "buyer@shop.test").await);
        let store = store_service::create(&db, owner, CreateStore::named("Cart shop")).await?.store;
        let wax = product_service::create(&db, owner, store.id, sample("Wax", 1_500, 10)).await?;
        let soap = product_service::create(&db, owner, store.id, sample("Soap", 300, 10)).await?;

        let empty_view = view(&db, buyer, store.id).await?;
        assert!(empty_view.cart_id.is_none());

        add_item(&db, buyer, store.id, AddItem { product_id: wax.id, quantity: 2 }).await?;
        add_item(&db, buyer, store.id, AddItem { product_id: wax.id, quantity: 1 }).await?;
        let v = add_item(&db, buyer, store.id, AddItem { product_id: soap.id, quantity: 4 }).await?;
        assert_eq!(v.items.len(), 2);
        assert_eq!(v.items[0].quantity, 3);
        assert_eq!(v.subtotal, 3 * 1_500 + 4 * 300);
        assert_eq!(v.currency, "XAF");

        let soap_line = v.items[1].item_id;
        let v = update_item(&db, buyer, store.id, soap_line, 0).await?;
        assert_eq!(v.items.len(), 1);

        clear(&db, buyer, store.id).await?;
        assert!(view(&db, buyer, store.id).await?.items.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn stock_and_quantity_bounds() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let owner = actor(seed_user(&db, "owner@shop.test").await);
        let buyer = actor(seed_user(&db, "buyer@shop.test").await);
        let other = actor(seed_user(&db, "other@shop.test").await);
        let store = store_service::create(&db, owner, CreateStore::named("Scarce")).await?.store;
        let rare = product_service::create(&db, owner, store.id, sample("Rare", 9_000, 2)).await?;
        let hidden = product_service::create(&db, owner, store.id, models::product::NewProduct { is_active: false, ..sample("Hidden", 1, 5) }).await?;

        let too_many = add_item(&db, buyer, store.id, AddItem { product_id: rare.id, quantity: 3 }).await;
        assert!(matches!(too_many, Err(ServiceError::Conflict(_))));
        let zero = add_item(&db, buyer, store.id, AddItem { product_id: rare.id, quantity: 0 }).await;
        assert!(matches!(zero, Err(ServiceError::Validation(_))));
        let inactive = add_item(&db, buyer, store.id, AddItem { product_id: hidden.id, quantity: 1 }).await;
        assert!(matches!(inactive, Err(ServiceError::NotFound(_))));

        let v = add_item(&db, buyer, store.id, AddItem { product_id: rare.id, quantity: 2 }).await?;
        let line = v.items[0].item_id;
        assert!(matches!(update_item(&db, buyer, store.id, line, 3).await, Err(ServiceError::Conflict(_))));
        // Someone else's line is invisible.
        assert!(matches!(remove_item(&db, other, store.id, line).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }
}
