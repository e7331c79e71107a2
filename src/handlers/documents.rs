use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use crate::api::{document_to_model, DocumentUpdateMetadataRequest};
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::ApiResponse;
use crate::state::AppState;

/// Multipart upload payload: `file` plus the `name` and `type` text fields.
struct UploadForm {
    file: Option<Vec<u8>>,
    name: Option<String>,
    content_type: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm { file: None, name: None, content_type: None };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::invalid_input(format!("Malformed multipart body: {}", e)))?
    {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::invalid_input(format!("Failed to read file field: {}", e)))?;
                form.file = Some(bytes.to_vec());
            }
            Some("name") => {
                form.name = Some(field.text().await.map_err(|e| {
                    ApiError::invalid_input(format!("Failed to read name field: {}", e))
                })?);
            }
            Some("type") => {
                form.content_type = Some(field.text().await.map_err(|e| {
                    ApiError::invalid_input(format!("Failed to read type field: {}", e))
                })?);
            }
            _ => {}
        }
    }

    Ok(form)
}

/// POST /documents - upload a file and create a document
pub async fn create(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_upload_form(multipart).await?;

    let file = form.file.unwrap_or_default();
    let name = form.name.unwrap_or_default();
    let content_type = form.content_type.unwrap_or_default();

    let saved = state
        .documents
        .create(&file, &name, &content_type, Some(auth_user.username.as_str()))
        .await?;

    let location = format!("/documents/{}", saved.public_id);
    Ok(ApiResponse::created_at(document_to_model(&saved), location))
}

/// GET /documents/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let doc = state.documents.get_by_public_id(id).await?;
    Ok(ApiResponse::success(document_to_model(&doc)))
}

/// PATCH /documents/:id - update name and/or type
pub async fn update_metadata(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DocumentUpdateMetadataRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .documents
        .update_metadata(id, payload.name.as_deref(), payload.content_type.as_deref())
        .await?;
    Ok(ApiResponse::success(document_to_model(&updated)))
}

/// PUT /documents/:id/content - overwrite the stored content in place
pub async fn replace_content(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_upload_form(multipart).await?;
    let file = form.file.unwrap_or_default();

    let updated = state.documents.replace_content(id, &file).await?;
    Ok(ApiResponse::success(document_to_model(&updated)))
}

/// DELETE /documents/:id
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.documents.delete(id).await?;
    Ok(ApiResponse::<()>::no_content())
}
