use axum::{extract::State, http::StatusCode, Extension};
use serde::Deserialize;
use uuid::Uuid;

use models::order;
use models::status::OrderStatus;
use service::cart_service::{self, AddItem, CartView};
use service::order_service::{self, CheckoutInput, OrderView};
use service::Page;

use crate::auth::CurrentUser;
use crate::errors::JsonApiError;
use crate::extract::{Json, Path, Query};
use crate::routes::PageQuery;
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct QuantityInput {
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub status: OrderStatus,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Only orders in this status.
    #[param(value_type = Option<String>)]
    pub status: Option<OrderStatus>,
}

#[utoipa::path(get, path = "/stores/{id}/cart", tag = "cart", params(("id" = Uuid, Path, description = "Store id")), security(("bearer" = [])), responses((status = 200, description = "Cart with subtotal")))]
pub async fn view_cart(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<CartView>, JsonApiError> {
    Ok(Json(cart_service::view(&state.db, user.actor(), id).await?))
}

#[utoipa::path(delete, path = "/stores/{id}/cart", tag = "cart", params(("id" = Uuid, Path, description = "Store id")), security(("bearer" = [])), responses((status = 204, description = "Emptied")))]
pub async fn clear_cart(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, JsonApiError> {
    cart_service::clear(&state.db, user.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post, path = "/stores/{id}/cart/items", tag = "cart",
    params(("id" = Uuid, Path, description = "Store id")),
    request_body = crate::openapi::AddItemRequest,
    security(("bearer" = [])),
    responses((status = 200, description = "Updated cart"), (status = 404, description = "Unknown or inactive product"), (status = 409, description = "Not enough stock"))
)]
pub async fn add_cart_item(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<AddItem>,
) -> Result<Json<CartView>, JsonApiError> {
    Ok(Json(cart_service::add_item(&state.db, user.actor(), id, input).await?))
}

#[utoipa::path(
    put, path = "/stores/{id}/cart/items/{item_id}", tag = "cart",
    params(("id" = Uuid, Path, description = "Store id"), ("item_id" = Uuid, Path, description = "Cart line id")),
    request_body = crate::openapi::QuantityRequest,
    security(("bearer" = [])),
    responses((status = 200, description = "Updated cart; quantity 0 removes the line"))
)]
pub async fn update_cart_item(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<QuantityInput>,
) -> Result<Json<CartView>, JsonApiError> {
    Ok(Json(cart_service::update_item(&state.db, user.actor(), id, item_id, input.quantity).await?))
}

#[utoipa::path(
    delete, path = "/stores/{id}/cart/items/{item_id}", tag = "cart",
    params(("id" = Uuid, Path, description = "Store id"), ("item_id" = Uuid, Path, description = "Cart line id")),
    security(("bearer" = [])),
    responses((status = 200, description = "Updated cart"))
)]
pub async fn remove_cart_item(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CartView>, JsonApiError> {
    Ok(Json(cart_service::remove_item(&state.db, user.actor(), id, item_id).await?))
}

#[utoipa::path(
    post, path = "/stores/{id}/checkout", tag = "orders",
    params(("id" = Uuid, Path, description = "Store id")),
    request_body = crate::openapi::CheckoutRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Order placed with an unpaid invoice"),
        (status = 400, description = "Empty cart"),
        (status = 402, description = "Plan order limit reached"),
        (status = 409, description = "Not enough stock")
    )
)]
pub async fn checkout(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<CheckoutInput>,
) -> Result<(StatusCode, Json<OrderView>), JsonApiError> {
    let placed = order_service::checkout(&state.db, user.actor(), id, input).await?;
    Ok((StatusCode::CREATED, Json(placed)))
}

#[utoipa::path(get, path = "/stores/{id}/orders", tag = "orders", params(("id" = Uuid, Path, description = "Store id"), OrderQuery), security(("bearer" = [])), responses((status = 200, description = "Store orders")))]
pub async fn list_store_orders(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Query(q): Query<OrderQuery>,
) -> Result<Json<Page<order::Model>>, JsonApiError> {
    let page = PageQuery { page: q.page, per_page: q.per_page }.pagination();
    Ok(Json(order_service::list_for_store(&state.db, user.actor(), id, q.status, page).await?))
}

#[utoipa::path(get, path = "/stores/{id}/orders/{order_id}", tag = "orders", params(("id" = Uuid, Path, description = "Store id"), ("order_id" = Uuid, Path, description = "Order id")), security(("bearer" = [])), responses((status = 200, description = "OK"), (status = 404, description = "Not Found")))]
pub async fn get_store_order(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path((id, order_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<OrderView>, JsonApiError> {
    Ok(Json(order_service::get_for_store(&state.db, user.actor(), id, order_id).await?))
}

#[utoipa::path(
    put, path = "/stores/{id}/orders/{order_id}/status", tag = "orders",
    params(("id" = Uuid, Path, description = "Store id"), ("order_id" = Uuid, Path, description = "Order id")),
    request_body = crate::openapi::OrderStatusRequest,
    security(("bearer" = [])),
    responses((status = 200, description = "Updated"), (status = 403, description = "Forbidden"), (status = 409, description = "Transition not allowed"))
)]
pub async fn set_order_status(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path((id, order_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<StatusInput>,
) -> Result<Json<OrderView>, JsonApiError> {
    Ok(Json(order_service::set_status(&state.db, user.actor(), id, order_id, input.status).await?))
}

#[utoipa::path(get, path = "/orders", tag = "orders", params(PageQuery), security(("bearer" = [])), responses((status = 200, description = "The caller's orders")))]
pub async fn list_my_orders(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Query(q): Query<PageQuery>,
) -> Result<Json<Page<order::Model>>, JsonApiError> {
    Ok(Json(order_service::list_mine(&state.db, user.actor(), q.pagination()).await?))
}

#[utoipa::path(get, path = "/orders/{id}", tag = "orders", params(("id" = Uuid, Path, description = "Order id")), security(("bearer" = [])), responses((status = 200, description = "OK"), (status = 404, description = "Not Found")))]
pub async fn get_my_order(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderView>, JsonApiError> {
    Ok(Json(order_service::get_mine(&state.db, user.actor(), id).await?))
}

#[utoipa::path(post, path = "/orders/{id}/cancel", tag = "orders", params(("id" = Uuid, Path, description = "Order id")), security(("bearer" = [])), responses((status = 200, description = "Cancelled"), (status = 409, description = "No longer pending")))]
pub async fn cancel_my_order(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderView>, JsonApiError> {
    Ok(Json(order_service::cancel_mine(&state.db, user.actor(), id).await?))
}
