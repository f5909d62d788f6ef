//! crates/retirement_core/src/error.rs
//!
//! Errors raised by the stores. Gateway failures are wrapped, never retried.

use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// An operation needed a signed-in identity and there was none.
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Failed to fetch from the gateway: {0}")]
    Fetch(#[source] PortError),

    #[error("Failed to write to the gateway: {0}")]
    Write(#[source] PortError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ProfileResult<T> = Result<T, ProfileError>;
