use axum::{extract::State, response::IntoResponse, Json};

use crate::api::LoginRequest;
use crate::error::ApiError;
use crate::middleware::response::ApiResponse;
use crate::state::AppState;

/// POST /auth/login - Authenticate user and receive JWT token
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let grant = state.auth.login(&payload.username, &payload.password).await?;
    Ok(ApiResponse::success(grant))
}
