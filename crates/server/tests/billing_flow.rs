mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{build_app, ADMIN_EMAIL};

#[tokio::test]
async fn paid_plan_activates_on_callback() -> anyhow::Result<()> {
    let app = build_app().await?;
    let admin = app.signup(ADMIN_EMAIL).await?;
    let owner = app.signup("owner@shop.test").await?;

    let plan = json!({"name": "Pro", "slug": "pro", "price": 15000, "max_products": 100, "max_orders": null});
    let (status, _) = app.call("POST", "/admin/plans", Some(&owner), Some(plan.clone())).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, created) = app.call("POST", "/admin/plans", Some(&admin), Some(plan)).await?;
    assert_eq!(status, StatusCode::CREATED);
    let plan_id = created["id"].as_str().unwrap_or_default().to_string();

    let (status, plans) = app.call("GET", "/plans", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plans[0]["slug"], "pro");

    let store_id = app.create_store(&owner, "Librairie").await?;
    let (status, outcome) = app
        .call("POST", &format!("/stores/{store_id}/subscription"), Some(&owner), Some(json!({"plan_id": plan_id})))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(outcome["subscription"]["status"], "pending");
    assert_eq!(outcome["invoice"]["amount"], 15000);

    let (_, current) = app.call("GET", &format!("/stores/{store_id}/subscription"), Some(&owner), None).await?;
    assert!(current["plan"].is_null());
    assert_eq!(current["limits"]["max_products"], 10);
    assert_eq!(current["pending"]["status"], "pending");

    let (status, started) = app
        .call("POST", &format!("/stores/{store_id}/subscription/payments"), Some(&owner), Some(json!({"payer_msisdn": "+24177000000"})))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let payment_id = started["payment"]["id"].as_str().unwrap_or_default().to_string();
    let bill_id = started["payment"]["provider_bill_id"].as_str().unwrap_or_default().to_string();

    app.gateway.settle(&bill_id);
    let (status, _) = app
        .post_form("/payments/ebilling/callback", &format!("reference={payment_id}&billingid={bill_id}&amount=15000.00"))
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, current) = app.call("GET", &format!("/stores/{store_id}/subscription"), Some(&owner), None).await?;
    assert_eq!(current["subscription"]["status"], "active");
    assert_eq!(current["plan"]["slug"], "pro");
    assert_eq!(current["limits"]["max_products"], 100);
    assert!(current["pending"].is_null());

    let (status, invoices) = app.call("GET", &format!("/stores/{store_id}/invoices?status=paid"), Some(&owner), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(invoices["total"], 1);

    let (status, payment) = app.call("GET", &format!("/payments/{payment_id}"), Some(&owner), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payment["status"], "paid");
    Ok(())
}

#[tokio::test]
async fn gateway_failure_surfaces_as_bad_gateway() -> anyhow::Result<()> {
    let app = build_app().await?;
    let admin = app.signup(ADMIN_EMAIL).await?;
    let owner = app.signup("owner@shop.test").await?;
    let (_, created) = app
        .call("POST", "/admin/plans", Some(&admin), Some(json!({"name": "Team", "slug": "team", "price": 9000})))
        .await?;
    let store_id = app.create_store(&owner, "Quincaillerie").await?;
    app.call("POST", &format!("/stores/{store_id}/subscription"), Some(&owner), Some(json!({"plan_id": created["id"]}))).await?;

    app.gateway.fail_requests(true);
    let (status, body) = app
        .call("POST", &format!("/stores/{store_id}/subscription/payments"), Some(&owner), Some(json!({"payer_msisdn": "066000000"})))
        .await?;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Payment Gateway Error");
    Ok(())
}

#[tokio::test]
async fn suspended_store_leaves_public_catalog() -> anyhow::Result<()> {
    let app = build_app().await?;
    let admin = app.signup(ADMIN_EMAIL).await?;
    let owner = app.signup("owner@shop.test").await?;
    let store_id = app.create_store(&owner, "Friperie").await?;

    let (status, _) = app.call("GET", &format!("/catalog/stores/{store_id}/categories"), None, None).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call("PUT", &format!("/admin/stores/{store_id}/status"), Some(&owner), Some(json!({"status": "suspended"})))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, store) = app
        .call("PUT", &format!("/admin/stores/{store_id}/status"), Some(&admin), Some(json!({"status": "suspended"})))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(store["status"], "suspended");

    let (status, _) = app.call("GET", &format!("/catalog/stores/{store_id}/products"), None, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    // Owners keep read access while suspended.
    let (status, _) = app.call("GET", &format!("/stores/{store_id}"), Some(&owner), None).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn order_limit_returns_payment_required() -> anyhow::Result<()> {
    let app = build_app().await?;
    let admin = app.signup(ADMIN_EMAIL).await?;
    let owner = app.signup("owner@shop.test").await?;
    let buyer = app.signup("buyer@shop.test").await?;
    let (_, plan) = app
        .call("POST", "/admin/plans", Some(&admin), Some(json!({"name": "Solo", "slug": "solo", "price": 0, "max_orders": 1})))
        .await?;
    let store_id = app.create_store(&owner, "Kiosque").await?;
    let (status, outcome) = app
        .call("POST", &format!("/stores/{store_id}/subscription"), Some(&owner), Some(json!({"plan_id": plan["id"]})))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(outcome["subscription"]["status"], "active");

    let (_, product) = app
        .call("POST", &format!("/stores/{store_id}/products"), Some(&owner), Some(json!({"name": "Cahier", "price": 300, "stock": 10})))
        .await?;
    let item = json!({"product_id": product["id"]});
    app.call("POST", &format!("/stores/{store_id}/cart/items"), Some(&buyer), Some(item.clone())).await?;
    let (status, _) = app.call("POST", &format!("/stores/{store_id}/checkout"), Some(&buyer), Some(json!({}))).await?;
    assert_eq!(status, StatusCode::CREATED);

    app.call("POST", &format!("/stores/{store_id}/cart/items"), Some(&buyer), Some(item)).await?;
    let (status, body) = app.call("POST", &format!("/stores/{store_id}/checkout"), Some(&buyer), Some(json!({}))).await?;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"], "Plan Limit Reached");
    Ok(())
}
