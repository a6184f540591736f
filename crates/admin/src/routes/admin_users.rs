//! Admin user management (super admins only).

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::instrument;

use partitur_core::{AdminUserId, ApiResponse};

use crate::db::AdminUserRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireSuperAdmin;
use crate::models::{AdminUserView, CreateAdminUser};
use crate::services::AuthService;
use crate::state::AppState;

/// `GET /api/admin-users`
#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn index(
    RequireSuperAdmin(admin): RequireSuperAdmin,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<AdminUserView>>>> {
    let users = AdminUserRepository::new(state.pool()).list_all().await?;
    Ok(Json(ApiResponse::ok(
        users.iter().map(AdminUserView::from).collect(),
    )))
}

/// `POST /api/admin-users`
#[instrument(skip(admin, state, body), fields(admin_id = %admin.id))]
pub async fn create(
    RequireSuperAdmin(admin): RequireSuperAdmin,
    State(state): State<AppState>,
    body: std::result::Result<Json<CreateAdminUser>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<AdminUserView>>)> {
    let Json(input) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let user = AuthService::new(state.pool())
        .create_admin(&input.email, &input.name, input.role, &input.password)
        .await?;

    let new_id = user.id.to_string();
    add_breadcrumb("admin_users", "Admin user created", Some(&[("new_admin_id", new_id.as_str())]));
    tracing::info!(new_admin_id = %user.id, role = ?user.role, "Admin user created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(AdminUserView::from(&user))),
    ))
}

/// `DELETE /api/admin-users/{id}`. An admin cannot delete their own account.
#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn destroy(
    RequireSuperAdmin(admin): RequireSuperAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>> {
    let id = AdminUserId::new(id);
    if id == admin.id {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    AdminUserRepository::new(state.pool()).delete(id).await?;

    let deleted_id = id.to_string();
    add_breadcrumb("admin_users", "Admin user deleted", Some(&[("deleted_admin_id", deleted_id.as_str())]));
    tracing::info!(deleted_admin_id = %id, "Admin user deleted");

    Ok(Json(ApiResponse::message("Admin user deleted")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use serde_json::json;

    use super::*;
    use crate::routes::tests::{json_body, login_as, request, send, test_app};

    #[tokio::test]
    async fn test_admin_role_is_forbidden() {
        let app = test_app();
        let cookie = login_as(&app, "admin").await;

        let (status, _) = send(
            &app,
            request("GET", "/api/admin-users", Some(&cookie)).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &app,
            json_body(
                &json!({"email": "baru@partitur.id", "name": "Baru", "password": "panjang-sekali-1"}),
                request("POST", "/api/admin-users", Some(&cookie)),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_cannot_delete_self() {
        let app = test_app();
        let cookie = login_as(&app, "super_admin").await;
        let (status, body) = send(
            &app,
            request("DELETE", "/api/admin-users/7", Some(&cookie)).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "You cannot delete your own account");
    }
}
