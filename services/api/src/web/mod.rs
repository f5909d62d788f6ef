pub mod auth;
pub mod documents;
pub mod dto;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod validation;
pub mod ws_handler;

use axum::http::StatusCode;
use retirement_core::{PortError, ProfileError};
use tracing::error;

pub use middleware::require_auth;
pub use ws_handler::ws_handler;

/// The error half of every handler's result.
pub type HandlerError = (StatusCode, String);

/// Maps a gateway failure to a status. Unexpected failures are logged and
/// reported with `context` only, never with the underlying message.
pub fn port_error(context: &str, e: PortError) -> HandlerError {
    match e {
        PortError::NotFound(what) => (StatusCode::NOT_FOUND, format!("Not found: {}", what)),
        PortError::Conflict(what) => (StatusCode::CONFLICT, what),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::Unexpected(msg) => {
            error!("{}: {}", context, msg);
            (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
        }
    }
}

pub fn profile_error(context: &str, e: ProfileError) -> HandlerError {
    match e {
        ProfileError::NotAuthenticated => {
            (StatusCode::UNAUTHORIZED, "Not authenticated".to_string())
        }
        ProfileError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
        ProfileError::Fetch(e) | ProfileError::Write(e) => port_error(context, e),
        ProfileError::Serialization(e) => {
            error!("{}: {:?}", context, e);
            (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
        }
    }
}
