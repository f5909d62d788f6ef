//! services/api/src/web/documents.rs
//!
//! Financial document upload and listing.

use axum::{
    extract::Multipart,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use bytes::Bytes;
use std::sync::Arc;
use tracing::info;

use crate::web::{dto::DocumentResponse, profile_error, state::UserContext, HandlerError};

/// Upload one document.
///
/// Accepts a multipart/form-data request with a `file` part and an optional
/// `description` part. Accepted types: jpg, jpeg, png, pdf, xls, xlsx, csv.
#[utoipa::path(
    post,
    path = "/documents",
    request_body(content_type = "multipart/form-data", description = "The document to upload."),
    responses(
        (status = 201, description = "Document stored", body = DocumentResponse),
        (status = 400, description = "Missing file or unsupported type"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn upload_document_handler(
    Extension(context): Extension<Arc<UserContext>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HandlerError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut description: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        let part = field.name().map(str::to_string);
        match part.as_deref() {
            Some("file") => {
                let name = field.file_name().unwrap_or("untitled").to_string();
                let data = field.bytes().await.map_err(|e| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read file bytes: {}", e),
                    )
                })?;
                file = Some((name, data));
            }
            Some("description") => {
                let text = field.text().await.map_err(|e| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read description: {}", e),
                    )
                })?;
                description = Some(text.trim().to_string()).filter(|t| !t.is_empty());
            }
            _ => {}
        }
    }

    let (file_name, data) = file.ok_or((
        StatusCode::BAD_REQUEST,
        "Multipart form must include a file".to_string(),
    ))?;

    let document = context
        .documents
        .upload(&file_name, data, description)
        .await
        .map_err(|e| profile_error("Failed to upload document", e))?;
    info!("Uploaded document {} ({} bytes)", document.id, document.file_size);
    Ok((StatusCode::CREATED, Json(DocumentResponse::from(document))))
}

/// The signed-in user's documents, newest first.
#[utoipa::path(
    get,
    path = "/documents",
    responses(
        (status = 200, description = "Documents", body = [DocumentResponse]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_documents_handler(
    Extension(context): Extension<Arc<UserContext>>,
) -> Result<Json<Vec<DocumentResponse>>, HandlerError> {
    let documents = context
        .documents
        .list()
        .await
        .map_err(|e| profile_error("Failed to list documents", e))?;
    Ok(Json(documents.into_iter().map(Into::into).collect()))
}
