//! Mobile-money and card payments through the EBILLING gateway.
//!
//! - `gateway`: the provider-neutral trait plus an in-memory double.
//! - `ebilling`: the HTTP client for the EBILLING merchant API.
//! - `service`: payment records, initiation and the gateway callback.

pub mod gateway;
pub mod ebilling;
pub mod service;

pub use ebilling::EbillingClient;
pub use gateway::{Bill, BillRequest, BillStatus, GatewayError, PaymentGateway};
pub use service::PaymentService;
