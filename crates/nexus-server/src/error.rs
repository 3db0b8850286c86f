use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use nexus_core::RegistryError;
use serde_json::json;
use thiserror::Error;
use tokio::task::JoinError;

/// Errors surfaced to HTTP callers as `{ "error": <message> }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Not found")]
    RouteNotFound,

    /// The invocation task died before producing a result.
    #[error("{0}")]
    Internal(String),
}

impl From<JoinError> for ApiError {
    fn from(e: JoinError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Registry(RegistryError::Validation) => StatusCode::BAD_REQUEST,
            ApiError::Registry(RegistryError::NotFound(_)) | ApiError::RouteNotFound => {
                StatusCode::NOT_FOUND
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
