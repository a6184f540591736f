//! Store settings: name, tagline, WhatsApp contact and logo.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;
use tracing::instrument;

use partitur_core::{ApiResponse, PhoneNumber, StoreSettings};

use crate::db::SettingsRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{RequireAdminAuth, RequireEditor};
use crate::models::ValidationError;
use crate::state::AppState;

const MAX_STORE_NAME_CHARS: usize = 100;
const MAX_TAGLINE_CHARS: usize = 200;

/// `PUT /api/settings` body. Blank optional fields clear the setting.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsInput {
    pub store_name: String,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub contact_whatsapp: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

impl SettingsInput {
    /// Validate and normalise into settings to store.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for a blank or overlong store name, an
    /// overlong tagline or a WhatsApp number that is not an Indonesian
    /// mobile number.
    pub fn validate(self) -> std::result::Result<StoreSettings, ValidationError> {
        let store_name = self.store_name.trim();
        if store_name.is_empty() {
            return Err(ValidationError("store_name is required".to_string()));
        }
        if store_name.chars().count() > MAX_STORE_NAME_CHARS {
            return Err(ValidationError(format!(
                "store_name must be at most {MAX_STORE_NAME_CHARS} characters"
            )));
        }

        let tagline = non_blank(self.tagline);
        if tagline
            .as_ref()
            .is_some_and(|t| t.chars().count() > MAX_TAGLINE_CHARS)
        {
            return Err(ValidationError(format!(
                "tagline must be at most {MAX_TAGLINE_CHARS} characters"
            )));
        }

        let contact_whatsapp = non_blank(self.contact_whatsapp)
            .map(|raw| {
                PhoneNumber::parse(&raw)
                    .map(|phone| phone.as_str().to_string())
                    .map_err(|e| ValidationError(format!("contact_whatsapp: {e}")))
            })
            .transpose()?;

        Ok(StoreSettings {
            store_name: store_name.to_string(),
            tagline,
            contact_whatsapp,
            logo_url: non_blank(self.logo_url),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `GET /api/settings`
#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn show(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<StoreSettings>>> {
    let settings = SettingsRepository::new(state.pool()).load().await?;
    Ok(Json(ApiResponse::ok(settings)))
}

/// `PUT /api/settings`: replace all settings.
#[instrument(skip(admin, state, body), fields(admin_id = %admin.id))]
pub async fn update(
    RequireEditor(admin): RequireEditor,
    State(state): State<AppState>,
    body: std::result::Result<Json<SettingsInput>, JsonRejection>,
) -> Result<Json<ApiResponse<StoreSettings>>> {
    let Json(input) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let settings = input.validate()?;

    SettingsRepository::new(state.pool()).save(&settings).await?;
    add_breadcrumb("settings", "Store settings updated", None);
    tracing::info!("Store settings updated");

    Ok(Json(ApiResponse::ok_with_message(settings, "Settings saved")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::routes::tests::{json_body, login_as, request, send, test_app};

    fn input(store_name: &str, whatsapp: Option<&str>) -> SettingsInput {
        SettingsInput {
            store_name: store_name.to_string(),
            tagline: Some("  Partitur paduan suara  ".to_string()),
            contact_whatsapp: whatsapp.map(String::from),
            logo_url: Some(String::new()),
        }
    }

    #[test]
    fn test_validate_normalises() {
        let settings = input(" Partitur ", Some("0812-3456-7890")).validate().unwrap();
        assert_eq!(settings.store_name, "Partitur");
        assert_eq!(settings.tagline.as_deref(), Some("Partitur paduan suara"));
        assert_eq!(settings.contact_whatsapp.as_deref(), Some("6281234567890"));
        assert_eq!(settings.logo_url, None);
    }

    #[test]
    fn test_validate_rejects() {
        assert!(input("   ", None).validate().is_err());
        assert!(input(&"x".repeat(101), None).validate().is_err());
        assert!(input("Partitur", Some("12345")).validate().is_err());
    }

    #[tokio::test]
    async fn test_viewer_cannot_update() {
        let app = test_app();
        let cookie = login_as(&app, "viewer").await;
        let (status, _) = send(
            &app,
            json_body(&json!({"store_name": "Partitur"}), request("PUT", "/api/settings", Some(&cookie))),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_invalid_whatsapp_is_400() {
        let app = test_app();
        let cookie = login_as(&app, "admin").await;
        let (status, body) = send(
            &app,
            json_body(
                &json!({"store_name": "Partitur", "contact_whatsapp": "+1 555 0100"}),
                request("PUT", "/api/settings", Some(&cookie)),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["message"].as_str().unwrap().starts_with("contact_whatsapp"));
    }
}
