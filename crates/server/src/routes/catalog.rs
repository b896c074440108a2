use axum::{extract::State, http::StatusCode, Extension};
use serde::Deserialize;
use uuid::Uuid;

use models::product::NewProduct;
use models::{category, product};
use service::product_service::{self, ProductFilter, ProductUpdate};
use service::{category_service, Page};

use crate::auth::CurrentUser;
use crate::errors::JsonApiError;
use crate::extract::{Json, Path, Query};
use crate::routes::PageQuery;
use crate::state::ServerState;

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub category_id: Option<Uuid>,
    /// Substring of the product name.
    pub q: Option<String>,
}

impl ProductQuery {
    fn split(self) -> (ProductFilter, service::Pagination) {
        let page = PageQuery { page: self.page, per_page: self.per_page }.pagination();
        (ProductFilter { category_id: self.category_id, q: self.q }, page)
    }
}

#[derive(Debug, Deserialize)]
pub struct CategoryInput {
    pub name: String,
}

#[utoipa::path(get, path = "/catalog/stores/{store_id}/products", tag = "catalog", params(("store_id" = Uuid, Path, description = "Store id"), ProductQuery), responses((status = 200, description = "Active products"), (status = 404, description = "Unknown or suspended store")))]
pub async fn public_products(
    State(state): State<ServerState>,
    Path(store_id): Path<Uuid>,
    Query(q): Query<ProductQuery>,
) -> Result<Json<Page<product::Model>>, JsonApiError> {
    let (filter, page) = q.split();
    Ok(Json(product_service::list_public(&state.db, store_id, filter, page).await?))
}

#[utoipa::path(get, path = "/catalog/stores/{store_id}/products/{product_id}", tag = "catalog", params(("store_id" = Uuid, Path, description = "Store id"), ("product_id" = Uuid, Path, description = "Product id")), responses((status = 200, description = "OK"), (status = 404, description = "Not Found")))]
pub async fn public_product(
    State(state): State<ServerState>,
    Path((store_id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<product::Model>, JsonApiError> {
    Ok(Json(product_service::get_public(&state.db, store_id, product_id).await?))
}

#[utoipa::path(get, path = "/catalog/stores/{store_id}/categories", tag = "catalog", params(("store_id" = Uuid, Path, description = "Store id")), responses((status = 200, description = "Categories")))]
pub async fn public_categories(
    State(state): State<ServerState>,
    Path(store_id): Path<Uuid>,
) -> Result<Json<Vec<category::Model>>, JsonApiError> {
    Ok(Json(category_service::list(&state.db, store_id).await?))
}

#[utoipa::path(
    post, path = "/stores/{id}/categories", tag = "catalog",
    params(("id" = Uuid, Path, description = "Store id")),
    request_body = crate::openapi::CategoryRequest,
    security(("bearer" = [])),
    responses((status = 201, description = "Created"), (status = 409, description = "Name taken"))
)]
pub async fn create_category(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<category::Model>), JsonApiError> {
    let created = category_service::create(&state.db, user.actor(), id, &input.name).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put, path = "/stores/{id}/categories/{category_id}", tag = "catalog",
    params(("id" = Uuid, Path, description = "Store id"), ("category_id" = Uuid, Path, description = "Category id")),
    request_body = crate::openapi::CategoryRequest,
    security(("bearer" = [])),
    responses((status = 200, description = "Renamed"), (status = 404, description = "Not Found"))
)]
pub async fn rename_category(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path((id, category_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<category::Model>, JsonApiError> {
    Ok(Json(category_service::rename(&state.db, user.actor(), id, category_id, &input.name).await?))
}

#[utoipa::path(
    delete, path = "/stores/{id}/categories/{category_id}", tag = "catalog",
    params(("id" = Uuid, Path, description = "Store id"), ("category_id" = Uuid, Path, description = "Category id")),
    security(("bearer" = [])),
    responses((status = 204, description = "Deleted"))
)]
pub async fn delete_category(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path((id, category_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, JsonApiError> {
    category_service::delete(&state.db, user.actor(), id, category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(get, path = "/stores/{id}/products", tag = "catalog", params(("id" = Uuid, Path, description = "Store id"), ProductQuery), security(("bearer" = [])), responses((status = 200, description = "All products, inactive included")))]
pub async fn list_products(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Query(q): Query<ProductQuery>,
) -> Result<Json<Page<product::Model>>, JsonApiError> {
    let (filter, page) = q.split();
    Ok(Json(product_service::list_admin(&state.db, user.actor(), id, filter, page).await?))
}

#[utoipa::path(
    post, path = "/stores/{id}/products", tag = "catalog",
    params(("id" = Uuid, Path, description = "Store id")),
    request_body = crate::openapi::ProductRequest,
    security(("bearer" = [])),
    responses((status = 201, description = "Created"), (status = 400, description = "Validation Error"), (status = 402, description = "Plan product limit reached"))
)]
pub async fn create_product(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<NewProduct>,
) -> Result<(StatusCode, Json<product::Model>), JsonApiError> {
    let created = product_service::create(&state.db, user.actor(), id, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put, path = "/stores/{id}/products/{product_id}", tag = "catalog",
    params(("id" = Uuid, Path, description = "Store id"), ("product_id" = Uuid, Path, description = "Product id")),
    request_body = crate::openapi::ProductUpdateRequest,
    security(("bearer" = [])),
    responses((status = 200, description = "Updated"), (status = 404, description = "Not Found"))
)]
pub async fn update_product(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path((id, product_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<ProductUpdate>,
) -> Result<Json<product::Model>, JsonApiError> {
    Ok(Json(product_service::update(&state.db, user.actor(), id, product_id, input).await?))
}

#[utoipa::path(
    delete, path = "/stores/{id}/products/{product_id}", tag = "catalog",
    params(("id" = Uuid, Path, description = "Store id"), ("product_id" = Uuid, Path, description = "Product id")),
    security(("bearer" = [])),
    responses((status = 204, description = "Deleted"))
)]
pub async fn delete_product(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path((id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, JsonApiError> {
    product_service::delete(&state.db, user.actor(), id, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
