//! Integration tests for Partitur.
//!
//! Every test runs against live servers and is `#[ignore]`d by default.
//!
//! # Running Tests
//!
//! ```bash
//! partitur-cli migrate
//! partitur-cli seed catalog crates/cli/seed/catalog.yaml
//! PARTITUR_ADMIN_PASSWORD='...' partitur-cli admin create -e qa@partitur.id -n QA -r super_admin
//!
//! cargo run -p partitur-storefront &
//! cargo run -p partitur-admin &
//!
//! TEST_ADMIN_EMAIL=qa@partitur.id TEST_ADMIN_PASSWORD='...' \
//!     cargo test -p partitur-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_BASE_URL` (default `http://localhost:3000`)
//! - `ADMIN_BASE_URL` (default `http://localhost:3001`)
//! - `TEST_ADMIN_EMAIL`, `TEST_ADMIN_PASSWORD` - a super admin account

#![allow(clippy::missing_panics_doc)]

use reqwest::Client;
use serde_json::{Value, json};

/// Base URL of the storefront.
#[must_use]
pub fn storefront_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Base URL of the back-office.
#[must_use]
pub fn admin_url() -> String {
    std::env::var("ADMIN_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_string())
}

/// Client that keeps cookies, so the storefront cart and admin session
/// survive between requests.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Client logged into the back-office as the test super admin.
pub async fn admin_client() -> Client {
    let email = std::env::var("TEST_ADMIN_EMAIL").expect("TEST_ADMIN_EMAIL not set");
    let password = std::env::var("TEST_ADMIN_PASSWORD").expect("TEST_ADMIN_PASSWORD not set");

    let client = client();
    let resp = client
        .post(format!("{}/api/auth/login", admin_url()))
        .json(&json!({"email": email, "password": password}))
        .send()
        .await
        .expect("Login request failed");
    assert!(resp.status().is_success(), "login failed: {}", resp.status());
    client
}

/// Parse a response body as JSON.
pub async fn body(resp: reqwest::Response) -> Value {
    resp.json().await.expect("Response is not JSON")
}

/// First published product from the storefront listing.
pub async fn first_product(client: &Client) -> Value {
    let resp = client
        .get(format!("{}/api/products?per_page=1", storefront_url()))
        .send()
        .await
        .expect("Request failed");
    let json = body(resp).await;
    json["data"]["items"][0].clone()
}
