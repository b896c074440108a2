mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::build_app;

#[tokio::test]
async fn checkout_pay_and_fulfil() -> anyhow::Result<()> {
    let app = build_app().await?;
    let owner = app.signup("owner@shop.test").await?;
    let customer = app.signup("buyer@shop.test").await?;
    let store_id = app.create_store(&owner, "Boutique Akanda").await?;

    let (status, product) = app
        .call("POST", &format!("/stores/{store_id}/products"), Some(&owner), Some(json!({"name": "Savon noir", "price": 5000, "stock": 5})))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let product_id = product["id"].as_str().unwrap_or_default().to_string();

    // Public catalog needs no token.
    let (status, listing) = app.call("GET", &format!("/catalog/stores/{store_id}/products"), None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["total"], 1);

    let (status, cart) = app
        .call("POST", &format!("/stores/{store_id}/cart/items"), Some(&customer), Some(json!({"product_id": product_id, "quantity": 2})))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["subtotal"], 10000);

    let (status, order) = app
        .call("POST", &format!("/stores/{store_id}/checkout"), Some(&customer), Some(json!({"shipping_address": "Quartier Louis, Libreville"})))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total"], 10000);
    assert_eq!(order["invoice"]["status"], "unpaid");
    let order_id = order["id"].as_str().unwrap_or_default().to_string();

    let (_, cart) = app.call("GET", &format!("/stores/{store_id}/cart"), Some(&customer), None).await?;
    assert_eq!(cart["items"].as_array().map(Vec::len), Some(0));
    let (_, products) = app.call("GET", &format!("/stores/{store_id}/products"), Some(&owner), None).await?;
    assert_eq!(products["items"][0]["stock"], 3);

    let (status, started) = app
        .call("POST", &format!("/orders/{order_id}/payments"), Some(&customer), Some(json!({"payer_msisdn": "074000000", "payment_system": "airtelmoney"})))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(started["reused"], false);
    let payment_id = started["payment"]["id"].as_str().unwrap_or_default().to_string();
    let bill_id = started["payment"]["provider_bill_id"].as_str().unwrap_or_default().to_string();
    assert!(started["portal_url"].as_str().unwrap_or_default().contains(&bill_id));
    assert_eq!(app.gateway.bill_count(), 1);

    let (status, _) = app
        .post_form("/payments/ebilling/callback", &format!("reference={payment_id}&billingid={bill_id}&amount=999"))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The buyer knows every field of the form, but the bill is still unpaid at the gateway.
    let form = format!("reference={payment_id}&billingid={bill_id}&amount=10000&transactionid=TX1&paymentsystem=airtelmoney");
    let (status, body) = app.post_form("/payments/ebilling/callback", &form).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation Error");
    let (_, mine) = app.call("GET", &format!("/orders/{order_id}"), Some(&customer), None).await?;
    assert_eq!(mine["status"], "pending");
    assert_eq!(mine["payment_status"], "unpaid");

    app.gateway.settle(&bill_id);
    let (status, ack) = app.post_form("/payments/ebilling/callback", &form).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["status"], "paid");
    assert_eq!(ack["refund_due"], false);
    // EBILLING may notify twice.
    let (status, _) = app.post_form("/payments/ebilling/callback", &form).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, mine) = app.call("GET", &format!("/orders/{order_id}"), Some(&customer), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["status"], "confirmed");
    assert_eq!(mine["payment_status"], "paid");
    assert_eq!(mine["invoice"]["status"], "paid");

    let (status, _) = app
        .call("PUT", &format!("/stores/{store_id}/orders/{order_id}/status"), Some(&owner), Some(json!({"status": "processing"})))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app
        .call("PUT", &format!("/stores/{store_id}/orders/{order_id}/status"), Some(&owner), Some(json!({"status": "delivered"})))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Invalid Transition");
    Ok(())
}

#[tokio::test]
async fn customer_cancel_restocks() -> anyhow::Result<()> {
    let app = build_app().await?;
    let owner = app.signup("owner@shop.test").await?;
    let customer = app.signup("buyer@shop.test").await?;
    let store_id = app.create_store(&owner, "Marche Mont-Bouet").await?;
    let (_, product) = app
        .call("POST", &format!("/stores/{store_id}/products"), Some(&owner), Some(json!({"name": "Pagne", "price": 12000, "stock": 1})))
        .await?;
    let product_id = product["id"].as_str().unwrap_or_default().to_string();

    let (status, _) = app
        .call("POST", &format!("/stores/{store_id}/cart/items"), Some(&customer), Some(json!({"product_id": product_id, "quantity": 2})))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    app.call("POST", &format!("/stores/{store_id}/cart/items"), Some(&customer), Some(json!({"product_id": product_id}))).await?;
    let (_, order) = app.call("POST", &format!("/stores/{store_id}/checkout"), Some(&customer), Some(json!({}))).await?;
    let order_id = order["id"].as_str().unwrap_or_default().to_string();

    let (status, cancelled) = app.call("POST", &format!("/orders/{order_id}/cancel"), Some(&customer), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(cancelled["invoice"]["status"], "void");

    let (_, products) = app.call("GET", &format!("/stores/{store_id}/products"), Some(&owner), None).await?;
    assert_eq!(products["items"][0]["stock"], 1);

    let (status, _) = app.call("POST", &format!("/orders/{order_id}/cancel"), Some(&customer), None).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn store_roles_gate_back_office() -> anyhow::Result<()> {
    let app = build_app().await?;
    let owner = app.signup("owner@shop.test").await?;
    let staff = app.signup("staff@shop.test").await?;
    let stranger = app.signup("nobody@shop.test").await?;
    let store_id = app.create_store(&owner, "Epicerie").await?;

    let (status, _) = app.call("GET", &format!("/stores/{store_id}/orders"), Some(&stranger), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, member) = app
        .call("POST", &format!("/stores/{store_id}/members"), Some(&owner), Some(json!({"email": "staff@shop.test", "role": "staff"})))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(member["role"], "staff");

    let (status, _) = app
        .call("POST", &format!("/stores/{store_id}/members"), Some(&owner), Some(json!({"email": "ghost@shop.test", "role": "staff"})))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Staff see orders but cannot touch the catalog.
    let (status, _) = app.call("GET", &format!("/stores/{store_id}/orders"), Some(&staff), None).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .call("POST", &format!("/stores/{store_id}/products"), Some(&staff), Some(json!({"name": "Riz", "price": 800})))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, stores) = app.call("GET", "/stores", Some(&staff), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stores["items"][0]["role"], "staff");
    Ok(())
}

#[tokio::test]
async fn oversized_price_is_rejected() -> anyhow::Result<()> {
    let app = build_app().await?;
    let owner = app.signup("owner@shop.test").await?;
    let store_id = app.create_store(&owner, "Bijouterie").await?;

    let (status, body) = app
        .call("POST", &format!("/stores/{store_id}/products"), Some(&owner), Some(json!({"name": "Lingot", "price": 1_i64 << 62, "stock": 5})))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation Error");

    // The largest accepted price still totals without overflow.
    let customer = app.signup("buyer@shop.test").await?;
    let (status, product) = app
        .call("POST", &format!("/stores/{store_id}/products"), Some(&owner), Some(json!({"name": "Lingot", "price": 1_000_000_000_000_i64, "stock": 5})))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, cart) = app
        .call("POST", &format!("/stores/{store_id}/cart/items"), Some(&customer), Some(json!({"product_id": product["id"], "quantity": 2})))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["subtotal"], 2_000_000_000_000_i64);
    Ok(())
}
