//! Integration tests for the cart, checkout and payment notification flow.
//!
//! These tests require:
//! - A migrated and seeded database
//! - The storefront server running (cargo run -p partitur-storefront)
//! - Midtrans sandbox keys for the checkout test

use partitur_core::TransactionStatus;
use partitur_integration_tests::{body, client, first_product, storefront_url};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
#[ignore = "Requires running storefront server and seeded catalog"]
async fn test_cart_lifecycle() {
    let client = client();
    let base_url = storefront_url();
    let product = first_product(&client).await;
    let product_id = product["id"].as_i64().expect("id");

    let resp = client
        .post(format!("{base_url}/api/cart/items"))
        .json(&json!({"product_id": product_id, "quantity": 2}))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let cart = body(resp).await;
    assert_eq!(cart["data"]["item_count"], 2);

    let resp = client
        .patch(format!("{base_url}/api/cart/items/{product_id}"))
        .json(&json!({"quantity": 1}))
        .send()
        .await
        .expect("Request failed");
    let cart = body(resp).await;
    assert_eq!(cart["data"]["item_count"], 1);
    assert_eq!(cart["data"]["total"], product["price"]);

    let resp = client
        .delete(format!("{base_url}/api/cart/items/{product_id}"))
        .send()
        .await
        .expect("Request failed");
    let cart = body(resp).await;
    assert_eq!(cart["data"]["item_count"], 0);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_unknown_product_cannot_be_added() {
    let resp = client()
        .post(format!("{}/api/cart/items", storefront_url()))
        .json(&json!({"product_id": 999_999_999, "quantity": 1}))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_checkout_with_empty_cart_is_rejected() {
    let resp = client()
        .post(format!("{}/api/payment/create", storefront_url()))
        .json(&json!({"customer_name": "Maria", "email": "maria@example.com"}))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront server, seeded catalog and Midtrans sandbox keys"]
async fn test_checkout_creates_pending_transaction() {
    let client = client();
    let base_url = storefront_url();
    let product = first_product(&client).await;

    client
        .post(format!("{base_url}/api/cart/items"))
        .json(&json!({"product_id": product["id"], "quantity": 1}))
        .send()
        .await
        .expect("Request failed");

    let resp = client
        .post(format!("{base_url}/api/payment/create"))
        .json(&json!({
            "customer_name": "Maria Simanjuntak",
            "email": "maria@example.com",
            "phone": "0812-3456-7890",
            "choir_name": "PS Cantate Domino",
        }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let payment = body(resp).await;
    let order_id = payment["data"]["order_id"].as_str().expect("order_id").to_string();
    assert!(payment["data"]["token"].is_string());

    // The cart is emptied once the payment exists.
    let cart = body(
        client
            .get(format!("{base_url}/api/cart"))
            .send()
            .await
            .expect("Request failed"),
    )
    .await;
    assert_eq!(cart["data"]["item_count"], 0);

    let status = body(
        client
            .get(format!("{base_url}/api/payment/status/{order_id}"))
            .send()
            .await
            .expect("Request failed"),
    )
    .await;
    let status: TransactionStatus = status["data"]["status"]
        .as_str()
        .expect("status")
        .parse()
        .expect("known status");
    assert_eq!(status, TransactionStatus::Pending);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_notification_with_bad_signature_is_rejected() {
    let resp = client()
        .post(format!("{}/api/payment/notification", storefront_url()))
        .json(&json!({
            "order_id": "PTR-20261001120000-ABCD",
            "status_code": "200",
            "gross_amount": "75000.00",
            "transaction_status": "settlement",
            "signature_key": "0".repeat(128),
        }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_client_log_intake() {
    let resp = client()
        .post(format!("{}/api/logs", storefront_url()))
        .json(&json!({"entries": [{"level": "error", "message": "Snap popup failed to open"}]}))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
}
