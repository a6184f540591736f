//! Public store configuration for the front end.

use axum::{extract::State, response::Response};
use serde::Serialize;
use tracing::instrument;

use partitur_core::StoreSettings;

use crate::error::Result;
use crate::routes::{public_json, store_settings};
use crate::state::AppState;

/// Everything the browser needs to render the shell and open Snap.
///
/// Holds no secrets; the Midtrans client key is public by design of Snap.js.
#[derive(Debug, Serialize)]
pub struct SiteConfig {
    pub store_name: String,
    pub tagline: Option<String>,
    pub contact_whatsapp: Option<String>,
    pub logo_url: Option<String>,
    pub midtrans_client_key: String,
    pub snap_js_url: String,
    pub ga4_measurement_id: Option<String>,
    pub is_production: bool,
}

impl SiteConfig {
    fn new(settings: StoreSettings, state: &AppState) -> Self {
        let config = state.config();
        Self {
            store_name: settings.store_name,
            tagline: settings.tagline,
            contact_whatsapp: settings.contact_whatsapp,
            logo_url: settings.logo_url,
            midtrans_client_key: state.midtrans().client_key().to_string(),
            snap_js_url: state.midtrans().snap_js_url(),
            ga4_measurement_id: config.analytics.ga4_measurement_id.clone(),
            is_production: config.midtrans.is_production,
        }
    }
}

/// `GET /api/site-config`.
///
/// # Errors
///
/// Returns 500 if the settings cannot be loaded.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>) -> Result<Response> {
    let settings = store_settings(&state).await?;
    Ok(public_json(SiteConfig::new(settings, &state)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::routes::tests::test_state;

    #[tokio::test]
    async fn test_site_config_never_exposes_server_key() {
        let state = test_state();
        let site = SiteConfig::new(StoreSettings::default(), &state);
        let json = serde_json::to_string(&site).unwrap();

        assert!(json.contains("\"store_name\":\"Partitur\""));
        assert!(json.contains("snap.js"));
        assert!(!json.contains("server_key"));
        assert!(!site.is_production);
    }
}
