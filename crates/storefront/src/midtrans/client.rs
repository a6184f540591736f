//! Midtrans HTTP client.
//!
//! Both Snap and the core API authenticate with HTTP basic auth: the server
//! key as username and an empty password.

use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, instrument};

use partitur_core::OrderId;

use super::MidtransError;
use super::types::{ErrorResponse, GatewayStatus, SnapRequest, SnapResponse};
use crate::config::MidtransConfig;

const SANDBOX_SNAP_BASE: &str = "https://app.sandbox.midtrans.com";
const PRODUCTION_SNAP_BASE: &str = "https://app.midtrans.com";
const SANDBOX_API_BASE: &str = "https://api.sandbox.midtrans.com";
const PRODUCTION_API_BASE: &str = "https://api.midtrans.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Client for Snap and the transaction status API.
#[derive(Clone)]
pub struct MidtransClient {
    client: Client,
    server_key: SecretString,
    client_key: String,
    snap_base: String,
    api_base: String,
}

impl std::fmt::Debug for MidtransClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidtransClient")
            .field("server_key", &"[REDACTED]")
            .field("client_key", &self.client_key)
            .field("snap_base", &self.snap_base)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl MidtransClient {
    /// Create a client for the sandbox or production environment.
    #[must_use]
    pub fn new(config: &MidtransConfig) -> Self {
        let (snap_base, api_base) = if config.is_production {
            (PRODUCTION_SNAP_BASE, PRODUCTION_API_BASE)
        } else {
            (SANDBOX_SNAP_BASE, SANDBOX_API_BASE)
        };

        Self::with_endpoints(config, snap_base, api_base)
    }

    /// Create a client against explicit base URLs (used by tests and
    /// local gateway mocks).
    #[must_use]
    pub fn with_endpoints(config: &MidtransConfig, snap_base: &str, api_base: &str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            server_key: config.server_key.clone(),
            client_key: config.client_key.clone(),
            snap_base: snap_base.trim_end_matches('/').to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Public client key for Snap.js.
    #[must_use]
    pub fn client_key(&self) -> &str {
        &self.client_key
    }

    /// Server key, used to verify notification signatures.
    #[must_use]
    pub const fn server_key(&self) -> &SecretString {
        &self.server_key
    }

    /// URL of the Snap.js script the browser loads.
    #[must_use]
    pub fn snap_js_url(&self) -> String {
        format!("{}/snap/snap.js", self.snap_base)
    }

    /// Create a Snap transaction and return its token and redirect URL.
    ///
    /// # Errors
    ///
    /// Returns `MidtransError::Request` on network failure,
    /// `MidtransError::Api` when Midtrans rejects the request.
    #[instrument(skip(self, request), fields(order_id = %request.transaction_details.order_id))]
    pub async fn create_snap_transaction(
        &self,
        request: &SnapRequest,
    ) -> Result<SnapResponse, MidtransError> {
        let response = self
            .client
            .post(format!("{}/snap/v1/transactions", self.snap_base))
            .basic_auth(self.server_key.expose_secret(), Some(""))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| MidtransError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body: ErrorResponse = response.json().await.unwrap_or_default();
            let message = body.message();
            error!(status = status.as_u16(), %message, "Snap transaction rejected");
            return Err(MidtransError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let snap: SnapResponse = response
            .json()
            .await
            .map_err(|e| MidtransError::Response(e.to_string()))?;

        debug!("Snap transaction created");
        Ok(snap)
    }

    /// Fetch the current status of an order.
    ///
    /// # Errors
    ///
    /// Returns `MidtransError::Api` with status 404 when Midtrans does not
    /// know the order (for example, the customer never opened Snap). Found
    /// transactions are returned even when their `status_code` is not 2xx.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn transaction_status(
        &self,
        order_id: &OrderId,
    ) -> Result<GatewayStatus, MidtransError> {
        let response = self
            .client
            .get(format!(
                "{}/v2/{}/status",
                self.api_base,
                urlencoding::encode(order_id.as_str())
            ))
            .basic_auth(self.server_key.expose_secret(), Some(""))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| MidtransError::Request(e.to_string()))?;

        let http_status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| MidtransError::Response(e.to_string()))?;

        // The status API reports failures in the body's `status_code`, often
        // with HTTP 200. A body carrying `transaction_status` is a found
        // transaction whatever its code: expired ones come back with 407.
        if body.get("transaction_status").is_none() {
            let status = body
                .get("status_code")
                .and_then(serde_json::Value::as_str)
                .and_then(|s| s.parse::<u16>().ok())
                .unwrap_or_else(|| http_status.as_u16());
            let message = body
                .get("status_message")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(MidtransError::Api { status, message });
        }

        serde_json::from_value(body).map_err(|e| MidtransError::Response(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Json, Router, routing::get};
    use serde_json::json;

    use super::*;

    /// Serve `body` from `/v2/{order_id}/status` on a local port.
    async fn status_api(body: serde_json::Value) -> String {
        let app = Router::new().route(
            "/v2/{order_id}/status",
            get(move || {
                let body = body.clone();
                async move { Json(body) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn order_id() -> OrderId {
        OrderId::parse("PTR-20261018093000-4F2A").unwrap()
    }

    fn config(is_production: bool) -> MidtransConfig {
        MidtransConfig {
            server_key: SecretString::from("SB-Mid-server-T3stK3yF0rUn1tT3sts"),
            client_key: "SB-Mid-client-abc".to_string(),
            is_production,
        }
    }

    #[test]
    fn test_sandbox_endpoints() {
        let client = MidtransClient::new(&config(false));
        assert_eq!(
            client.snap_js_url(),
            "https://app.sandbox.midtrans.com/snap/snap.js"
        );
        assert_eq!(client.api_base, SANDBOX_API_BASE);
    }

    #[test]
    fn test_production_endpoints() {
        let client = MidtransClient::new(&config(true));
        assert_eq!(client.snap_js_url(), "https://app.midtrans.com/snap/snap.js");
        assert_eq!(client.api_base, PRODUCTION_API_BASE);
    }

    #[test]
    fn test_debug_redacts_server_key() {
        let client = MidtransClient::new(&config(false));
        let debug = format!("{client:?}");
        assert!(!debug.contains("T3stK3yF0rUn1tT3sts"));
        assert!(debug.contains("SB-Mid-client-abc"));
    }

    #[tokio::test]
    async fn test_status_of_settled_transaction() {
        let base = status_api(json!({
            "status_code": "200",
            "status_message": "Success, transaction is found",
            "order_id": "PTR-20261018093000-4F2A",
            "gross_amount": "150000.00",
            "transaction_status": "settlement",
            "fraud_status": "accept"
        }))
        .await;
        let client = MidtransClient::with_endpoints(&config(false), &base, &base);

        let status = client.transaction_status(&order_id()).await.unwrap();
        assert_eq!(status.transaction_status, "settlement");
        assert_eq!(status.gross_amount, "150000.00");
    }

    #[tokio::test]
    async fn test_expired_transaction_is_a_status_not_an_error() {
        let base = status_api(json!({
            "status_code": "407",
            "status_message": "Success, transaction is found",
            "order_id": "PTR-20261018093000-4F2A",
            "gross_amount": "150000.00",
            "transaction_status": "expire",
            "payment_type": "bank_transfer"
        }))
        .await;
        let client = MidtransClient::with_endpoints(&config(false), &base, &base);

        let status = client.transaction_status(&order_id()).await.unwrap();
        assert_eq!(status.transaction_status, "expire");
        assert_eq!(status.status_code, "407");
    }

    #[tokio::test]
    async fn test_unknown_transaction_is_an_error() {
        let base = status_api(json!({
            "status_code": "404",
            "status_message": "Transaction doesn't exist."
        }))
        .await;
        let client = MidtransClient::with_endpoints(&config(false), &base, &base);

        let err = client.transaction_status(&order_id()).await.unwrap_err();
        assert!(matches!(
            err,
            MidtransError::Api { status: 404, ref message } if message == "Transaction doesn't exist."
        ));
    }
}
