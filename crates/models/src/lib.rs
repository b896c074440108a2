//! Entities, column enums and field validation for the storefront schema.

pub mod errors;
pub mod db;
pub mod status;
pub mod user;
pub mod user_credentials;
pub mod store;
pub mod store_member;
pub mod plan;
pub mod subscription;
pub mod category;
pub mod product;
pub mod cart;
pub mod cart_item;
pub mod order;
pub mod order_item;
pub mod invoice;
pub mod payment;
