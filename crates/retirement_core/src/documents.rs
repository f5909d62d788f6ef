//! crates/retirement_core/src/documents.rs
//!
//! Uploading financial documents: the blob goes to the `documents` bucket under
//! the owner's id, the metadata row goes to the `documents` table.

use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::Document;
use crate::error::{ProfileError, ProfileResult};
use crate::ports::{BlobStorage, ProfileRepository, UploadOptions};
use crate::session::SessionStore;

pub const DOCUMENTS_BUCKET: &str = "documents";
pub const ACCEPTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "pdf", "xls", "xlsx", "csv"];
pub const PENDING_ANALYSIS: &str = "pending_analysis";

/// Lower-cased extension of `file_name`, if it is one we accept.
pub fn accepted_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ACCEPTED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

#[derive(Clone)]
pub struct DocumentUploader {
    session: SessionStore,
    rows: Arc<dyn ProfileRepository>,
    blobs: Arc<dyn BlobStorage>,
}

impl DocumentUploader {
    pub fn new(
        session: SessionStore,
        rows: Arc<dyn ProfileRepository>,
        blobs: Arc<dyn BlobStorage>,
    ) -> Self {
        Self {
            session,
            rows,
            blobs,
        }
    }

    /// Stores one file and records its metadata with status `pending_analysis`.
    pub async fn upload(
        &self,
        file_name: &str,
        data: Bytes,
        description: Option<String>,
    ) -> ProfileResult<Document> {
        let user_id = self.require_user_id()?;
        let ext = accepted_extension(file_name).ok_or_else(|| {
            ProfileError::Validation(format!(
                "'{}' is not an accepted document type ({})",
                file_name,
                ACCEPTED_EXTENSIONS.join(", ")
            ))
        })?;

        let path = format!(
            "{}/{}-{}.{}",
            user_id,
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            ext
        );
        let file_size = data.len() as i64;

        let storage_path = self
            .blobs
            .upload(DOCUMENTS_BUCKET, &path, data, UploadOptions::default())
            .await
            .map_err(|e| {
                error!("Upload error for {}: {}", file_name, e);
                ProfileError::Write(e)
            })?;

        let document = Document {
            id: Uuid::new_v4(),
            user_id,
            file_name: file_name.to_string(),
            storage_path,
            file_type: ext,
            description: description.filter(|d| !d.trim().is_empty()),
            file_size,
            status: PENDING_ANALYSIS.to_string(),
            created_at: Utc::now(),
        };
        self.rows
            .insert_document(&document)
            .await
            .map_err(ProfileError::Write)?;

        info!("{} uploaded successfully as {}", file_name, document.storage_path);
        Ok(document)
    }

    /// The signed-in user's documents, newest first.
    pub async fn list(&self) -> ProfileResult<Vec<Document>> {
        let user_id = self.require_user_id()?;
        self.rows
            .list_documents(user_id)
            .await
            .map_err(ProfileError::Fetch)
    }

    /// Deletes every stored file of the signed-in user. Metadata rows are left
    /// to `ProfileStore::delete_account`.
    pub async fn remove_all(&self) -> ProfileResult<()> {
        let user_id = self.require_user_id()?;
        self.blobs
            .remove_prefix(DOCUMENTS_BUCKET, &format!("{}/", user_id))
            .await
            .map_err(ProfileError::Write)
    }

    fn require_user_id(&self) -> ProfileResult<Uuid> {
        self.session
            .current_identity()
            .map(|identity| identity.id)
            .ok_or(ProfileError::NotAuthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_extensions_case_insensitively() {
        assert_eq!(accepted_extension("statement.PDF").as_deref(), Some("pdf"));
        assert_eq!(accepted_extension("budget.2024.xlsx").as_deref(), Some("xlsx"));
    }

    #[test]
    fn rejects_unknown_or_missing_extensions() {
        assert_eq!(accepted_extension("notes.docx"), None);
        assert_eq!(accepted_extension("README"), None);
    }
}
