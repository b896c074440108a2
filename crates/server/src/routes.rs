pub mod admin;
pub mod auth;
pub mod billing;
pub mod catalog;
pub mod orders;
pub mod stores;

use axum::{
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::types::Health;
use service::Pagination;

use crate::openapi::ApiDoc;
use crate::state::ServerState;

/// `page` / `per_page` query parameters shared by every listing.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page index.
    pub page: Option<u32>,
    /// Page size, clamped to 1..=100.
    pub per_page: Option<u32>,
}

impl PageQuery {
    pub fn pagination(&self) -> Pagination {
        let d = Pagination::default();
        Pagination { page: self.page.unwrap_or(d.page), per_page: self.per_page.unwrap_or(d.per_page) }
    }
}

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Build the full application router: public endpoints, the bearer-protected
/// API, and the Swagger UI.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/plans", get(billing::list_plans))
        .route("/catalog/stores/:store_id/products", get(catalog::public_products))
        .route("/catalog/stores/:store_id/products/:product_id", get(catalog::public_product))
        .route("/catalog/stores/:store_id/categories", get(catalog::public_categories))
        .route("/payments/ebilling/callback", post(billing::ebilling_callback));

    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        // platform administration
        .route("/admin/plans", post(admin::create_plan))
        .route("/admin/plans/:id", put(admin::update_plan))
        .route("/admin/stores/:id/status", put(admin::set_store_status))
        // stores and members
        .route("/stores", get(stores::list).post(stores::create))
        .route("/stores/:id", get(stores::get).put(stores::update).delete(stores::delete))
        .route("/stores/:id/usage", get(stores::usage))
        .route("/stores/:id/members", get(stores::list_members).post(stores::add_member))
        .route("/stores/:id/members/:user_id", put(stores::change_member_role).delete(stores::remove_member))
        // back-office catalog
        .route("/stores/:id/categories", post(catalog::create_category))
        .route("/stores/:id/categories/:category_id", put(catalog::rename_category).delete(catalog::delete_category))
        .route("/stores/:id/products", get(catalog::list_products).post(catalog::create_product))
        .route("/stores/:id/products/:product_id", put(catalog::update_product).delete(catalog::delete_product))
        // shopping
        .route("/stores/:id/cart", get(orders::view_cart).delete(orders::clear_cart))
        .route("/stores/:id/cart/items", post(orders::add_cart_item))
        .route("/stores/:id/cart/items/:item_id", put(orders::update_cart_item).delete(orders::remove_cart_item))
        .route("/stores/:id/checkout", post(orders::checkout))
        .route("/stores/:id/orders", get(orders::list_store_orders))
        .route("/stores/:id/orders/:order_id", get(orders::get_store_order))
        .route("/stores/:id/orders/:order_id/status", put(orders::set_order_status))
        .route("/orders", get(orders::list_my_orders))
        .route("/orders/:id", get(orders::get_my_order))
        .route("/orders/:id/cancel", post(orders::cancel_my_order))
        // billing
        .route("/orders/:id/payments", post(billing::pay_order))
        .route("/payments/:id", get(billing::get_payment))
        .route("/stores/:id/invoices", get(billing::list_invoices))
        .route("/invoices/:id", get(billing::get_invoice))
        .route("/stores/:id/subscription", get(billing::current_subscription).post(billing::subscribe))
        .route("/stores/:id/subscription/cancel", post(billing::cancel_subscription))
        .route("/stores/:id/subscription/payments", post(billing::pay_subscription))
        .route_layer(middleware::from_fn_with_state(state.clone(), crate::auth::require_user));

    public
        .merge(protected)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
