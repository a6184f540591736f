//! Login, logout and the current admin.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use tower_sessions::Session;
use tracing::instrument;

use partitur_core::ApiResponse;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{RequireAdminAuth, clear_current_admin, set_current_admin};
use crate::models::{CurrentAdmin, LoginRequest};
use crate::services::AuthService;
use crate::state::AppState;

/// `POST /api/auth/login`.
///
/// # Errors
///
/// Returns 401 with a generic message for any credential failure.
#[instrument(skip(state, session, payload))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<CurrentAdmin>>> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let user = AuthService::new(state.pool())
        .login(&request.email, &request.password)
        .await
        .inspect_err(|e| tracing::info!(error = %e, "Admin login failed"))?;

    let admin = CurrentAdmin::from(&user);
    set_current_admin(&session, &admin).await?;

    let admin_id = admin.id.to_string();
    tracing::info!(admin_id = %admin_id, role = %admin.role, "Admin logged in");
    add_breadcrumb("auth", "Admin logged in", Some(&[("admin_id", admin_id.as_str())]));

    Ok(Json(ApiResponse::ok(admin)))
}

/// `POST /api/auth/logout`. Succeeds whether or not anyone was logged in.
///
/// # Errors
///
/// Returns 500 if the session cannot be deleted.
pub async fn logout(session: Session) -> Result<Json<ApiResponse<()>>> {
    clear_current_admin(&session).await?;
    Ok(Json(ApiResponse::<()>::message("Logged out")))
}

/// `GET /api/auth/me`.
pub async fn me(RequireAdminAuth(admin): RequireAdminAuth) -> Json<ApiResponse<CurrentAdmin>> {
    Json(ApiResponse::ok(admin))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::routes::tests::{json_body, login_as, request, send, test_app};

    #[tokio::test]
    async fn test_malformed_login_is_bad_request() {
        let app = test_app();
        let (status, _) = send(
            &app,
            json_body(&json!({"email": "a@b.id"}), request("POST", "/api/auth/login", None)),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let app = test_app();
        let cookie = login_as(&app, "admin").await;

        let (status, _) = send(
            &app,
            request("POST", "/api/auth/logout", Some(&cookie)).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            request("GET", "/api/auth/me", Some(&cookie)).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
