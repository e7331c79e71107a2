use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use crate::api::{
    protocol_to_model, ProtocolCreateRequest, ProtocolStateUpdateRequest, ProtocolUpdateRequest,
};
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::ApiResponse;
use crate::state::AppState;

/// POST /protocols
pub async fn create(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<ProtocolCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let saved = state
        .protocols
        .create(&payload.document_ids, payload.state, Some(auth_user.username.as_str()))
        .await?;

    let location = format!("/protocols/{}", saved.public_id);
    Ok(ApiResponse::created_at(protocol_to_model(&saved)?, location))
}

/// GET /protocols/:id - always returns the attached document set
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let protocol = state.protocols.get_by_public_id(id).await?;
    Ok(ApiResponse::success(protocol_to_model(&protocol)?))
}

/// PUT /protocols/:id - full update: state plus a complete document-set replace
pub async fn update_all(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<ProtocolUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .protocols
        .update_all(id, payload.state, &payload.document_ids, Some(auth_user.username.as_str()))
        .await?;
    Ok(ApiResponse::success(protocol_to_model(&updated)?))
}

/// PATCH /protocols/:id/state - state-only update, document set untouched
pub async fn update_state(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<ProtocolStateUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .protocols
        .update_state(id, payload.state, Some(auth_user.username.as_str()))
        .await?;
    Ok(ApiResponse::success(protocol_to_model(&updated)?))
}
