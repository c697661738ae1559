//! HTTP handlers for the registry service.

pub mod health;
pub mod root;
pub mod user;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::registry::RegistryError;

impl IntoResponse for RegistryError {
    /// Validation messages are returned verbatim; storage details stay in the
    /// server log.
    fn into_response(self) -> Response {
        match self {
            Self::Validation(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            Self::NotFound => (StatusCode::NOT_FOUND, "User not found").into_response(),
            Self::StorageUnavailable(err) => {
                error!("Storage error: {err}");
                (StatusCode::SERVICE_UNAVAILABLE, "Storage unavailable").into_response()
            }
            Self::CorruptRecord(detail) => {
                error!("Corrupt account record: {detail}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
