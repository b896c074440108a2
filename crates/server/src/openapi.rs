use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct RegisterRequest { pub email: String, pub name: String, pub password: String }

#[derive(ToSchema)]
pub struct LoginRequest { pub email: String, pub password: String }

#[derive(ToSchema)]
pub struct PlanRequest {
    pub name: String,
    pub slug: String,
    /// Minor currency units.
    pub price: i64,
    pub currency: Option<String>,
    pub interval_days: Option<i32>,
    pub max_products: Option<i32>,
    pub max_orders: Option<i32>,
    pub max_storage_mb: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(ToSchema)]
pub struct StoreStatusRequest {
    /// `active` or `suspended`.
    pub status: String,
}

#[derive(ToSchema)]
pub struct CreateStoreRequest {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub currency: Option<String>,
}

#[derive(ToSchema)]
pub struct UpdateStoreRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub currency: Option<String>,
}

#[derive(ToSchema)]
pub struct AddMemberRequest {
    pub email: String,
    /// `admin`, `manager` or `staff`.
    pub role: String,
}

#[derive(ToSchema)]
pub struct RoleRequest { pub role: String }

#[derive(ToSchema)]
pub struct CategoryRequest { pub name: String }

#[derive(ToSchema)]
pub struct ProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub price: i64,
    pub stock: Option<i32>,
    pub category_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

/// Omitted fields are left unchanged; an explicit `null` clears nullable ones.
#[derive(ToSchema)]
pub struct ProductUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub price: Option<i64>,
    pub stock: Option<i32>,
    pub category_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

#[derive(ToSchema)]
pub struct AddItemRequest { pub product_id: Uuid, pub quantity: Option<i32> }

#[derive(ToSchema)]
pub struct QuantityRequest { pub quantity: i32 }

#[derive(ToSchema)]
pub struct CheckoutRequest { pub shipping_address: Option<String>, pub note: Option<String> }

#[derive(ToSchema)]
pub struct OrderStatusRequest {
    /// `confirmed`, `processing`, `shipped`, `delivered` or `cancelled`.
    pub status: String,
}

#[derive(ToSchema)]
pub struct InitiatePaymentRequest {
    pub payer_msisdn: String,
    pub payer_email: Option<String>,
    /// `airtelmoney` or `moovmoney`.
    pub payment_system: Option<String>,
}

#[derive(ToSchema)]
pub struct EbillingCallbackForm {
    /// Payment id sent as `external_reference` when the bill was created.
    pub reference: String,
    pub billingid: String,
    pub amount: String,
    pub transactionid: Option<String>,
    pub paymentsystem: Option<String>,
}

#[derive(ToSchema)]
pub struct SubscribeRequest { pub plan_id: Uuid }

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::auth::me,
        crate::routes::admin::create_plan,
        crate::routes::admin::update_plan,
        crate::routes::admin::set_store_status,
        crate::routes::stores::list,
        crate::routes::stores::create,
        crate::routes::stores::get,
        crate::routes::stores::update,
        crate::routes::stores::delete,
        crate::routes::stores::usage,
        crate::routes::stores::list_members,
        crate::routes::stores::add_member,
        crate::routes::stores::change_member_role,
        crate::routes::stores::remove_member,
        crate::routes::catalog::public_products,
        crate::routes::catalog::public_product,
        crate::routes::catalog::public_categories,
        crate::routes::catalog::create_category,
        crate::routes::catalog::rename_category,
        crate::routes::catalog::delete_category,
        crate::routes::catalog::list_products,
        crate::routes::catalog::create_product,
        crate::routes::catalog::update_product,
        crate::routes::catalog::delete_product,
        crate::routes::orders::view_cart,
        crate::routes::orders::clear_cart,
        crate::routes::orders::add_cart_item,
        crate::routes::orders::update_cart_item,
        crate::routes::orders::remove_cart_item,
        crate::routes::orders::checkout,
        crate::routes::orders::list_store_orders,
        crate::routes::orders::get_store_order,
        crate::routes::orders::set_order_status,
        crate::routes::orders::list_my_orders,
        crate::routes::orders::get_my_order,
        crate::routes::orders::cancel_my_order,
        crate::routes::billing::list_plans,
        crate::routes::billing::pay_order,
        crate::routes::billing::pay_subscription,
        crate::routes::billing::get_payment,
        crate::routes::billing::ebilling_callback,
        crate::routes::billing::list_invoices,
        crate::routes::billing::get_invoice,
        crate::routes::billing::current_subscription,
        crate::routes::billing::subscribe,
        crate::routes::billing::cancel_subscription,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            PlanRequest,
            StoreStatusRequest,
            CreateStoreRequest,
            UpdateStoreRequest,
            AddMemberRequest,
            RoleRequest,
            CategoryRequest,
            ProductRequest,
            ProductUpdateRequest,
            AddItemRequest,
            QuantityRequest,
            CheckoutRequest,
            OrderStatusRequest,
            InitiatePaymentRequest,
            EbillingCallbackForm,
            SubscribeRequest,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health"),
        (name = "auth"),
        (name = "admin"),
        (name = "stores"),
        (name = "members"),
        (name = "catalog"),
        (name = "cart"),
        (name = "orders"),
        (name = "billing")
    )
)]
pub struct ApiDoc;
