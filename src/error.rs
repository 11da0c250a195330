//! Service-level error taxonomy.
//!
//! Every public operation surfaces one of these variants; handlers rely on
//! the [`IntoResponse`] impl to map them to stable JSON error bodies.

use crate::vod::VodError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Entity absent or soft-deleted.
    #[error("{0}")]
    NotFound(String),

    /// Network, DNS, or timeout failure talking to the VOD provider.
    #[error("remote provider unavailable: {0}")]
    RemoteUnavailable(String),

    /// Provider rejected the configured access key pair.
    #[error("remote provider rejected credentials: {0}")]
    RemoteAuthFailure(String),

    /// Account suspended or delinquent at the provider.
    #[error("remote provider quota exceeded: {0}")]
    RemoteQuotaExceeded(String),

    /// Malformed input (missing required fields, bad id, ...).
    #[error("{0}")]
    Validation(String),

    /// Persistence failure in the local catalog store.
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl ServiceError {
    /// Stable machine-readable code, part of the public API.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "not_found",
            ServiceError::RemoteUnavailable(_) => "remote_unavailable",
            ServiceError::RemoteAuthFailure(_) => "remote_auth_failure",
            ServiceError::RemoteQuotaExceeded(_) => "remote_quota_exceeded",
            ServiceError::Validation(_) => "validation_error",
            ServiceError::Store(_) => "store_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::RemoteUnavailable(_)
            | ServiceError::RemoteAuthFailure(_)
            | ServiceError::RemoteQuotaExceeded(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<VodError> for ServiceError {
    fn from(err: VodError) -> Self {
        match err {
            VodError::Auth { .. } => ServiceError::RemoteAuthFailure(err.to_string()),
            VodError::NotFound { .. } => ServiceError::NotFound(err.to_string()),
            VodError::QuotaExceeded { .. } => ServiceError::RemoteQuotaExceeded(err.to_string()),
            VodError::Network(_) | VodError::Unknown { .. } => {
                ServiceError::RemoteUnavailable(err.to_string())
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "error": self.code(),
            "message": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}
