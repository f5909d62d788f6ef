//! crates/retirement_core/src/ports.rs
//!
//! Defines the gateway contracts (traits) the stores depend on.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the hosted identity, row storage and blob storage services.

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;
use crate::domain::{
    AuthSession, Document, FinancialGoals, FinancialProfile, Identity, OAuthProvider,
    PersonalInfo, ProfileSnapshot, ProfileVersion,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Gateway Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait IdentityGateway: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> PortResult<AuthSession>;

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<AuthSession>;

    /// Returns the provider URL the browser must be redirected to.
    async fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_url: &str,
    ) -> PortResult<String>;

    async fn sign_out(&self, token: &str) -> PortResult<()>;

    /// Issues a recovery token for the account, if one exists.
    async fn reset_password(&self, email: &str) -> PortResult<()>;

    async fn update_password(&self, user_id: Uuid, new_password: &str) -> PortResult<()>;

    async fn resend_verification(&self, email: &str) -> PortResult<()>;

    /// Consumes an emailed signup or recovery token and opens a session.
    async fn verify_token(&self, token: &str) -> PortResult<AuthSession>;

    async fn get_user(&self, user_id: Uuid) -> PortResult<Identity>;

    /// Resolves a session token. `Ok(None)` means unknown or expired.
    async fn get_session(&self, token: &str) -> PortResult<Option<AuthSession>>;

    async fn admin_delete_user(&self, user_id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    // --- Profile records (one row per identity) ---
    async fn fetch_personal_info(&self, user_id: Uuid) -> PortResult<Option<PersonalInfo>>;

    async fn fetch_financial_goals(&self, user_id: Uuid) -> PortResult<Option<FinancialGoals>>;

    /// Upserts the record carried by `snapshot` and appends the matching
    /// version entry in one transaction. Either both land or neither does.
    async fn upsert_with_version(
        &self,
        user_id: Uuid,
        snapshot: &ProfileSnapshot,
    ) -> PortResult<ProfileVersion>;

    async fn upsert_financial_profile(
        &self,
        user_id: Uuid,
        profile: &FinancialProfile,
    ) -> PortResult<()>;

    // --- Version history ---
    /// Newest first.
    async fn list_versions(&self, user_id: Uuid) -> PortResult<Vec<ProfileVersion>>;

    // --- Documents ---
    async fn insert_document(&self, document: &Document) -> PortResult<()>;

    async fn list_documents(&self, user_id: Uuid) -> PortResult<Vec<Document>>;

    /// Removes every row owned by the identity, atomically.
    async fn delete_user_data(&self, user_id: Uuid) -> PortResult<()>;
}

/// Options forwarded to the blob store on upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    /// Cache lifetime in seconds.
    pub cache_control: u32,
    /// Overwrite an existing object at the same path.
    pub upsert: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            cache_control: 3600,
            upsert: false,
        }
    }
}

#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Stores `data` under `bucket/path` and returns the stored path.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Bytes,
        options: UploadOptions,
    ) -> PortResult<String>;

    /// Deletes every object whose path starts with `prefix`.
    async fn remove_prefix(&self, bucket: &str, prefix: &str) -> PortResult<()>;
}
