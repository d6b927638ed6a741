use axum::{extract::State, Json};
use shared::{AdminView, LoginRequest, LoginResponse};
use tracing::info;

use crate::auth::AuthAdmin;
use crate::error::ApiError;
use crate::rest::AppState;

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    info!("POST /api/auth/login");

    let response = state.auth_service.login(request.email, request.password).await?;
    Ok(Json(response))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    admin: AuthAdmin,
) -> Result<Json<AdminView>, ApiError> {
    info!("GET /api/auth/me - {}", admin.email);

    let view = state.auth_service.current_admin(&admin.id).await?;
    Ok(Json(view))
}
