//! HTTP error mapping

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use banker_service::ServiceError;
use serde_json::json;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Invalid request body: {0}")]
    Body(#[from] JsonRejection),

    #[error("Session {0} not found")]
    SessionNotFound(Uuid),

    #[error("Session limit of {0} reached")]
    SessionLimit(usize),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Service(ServiceError::Validation(_)) => StatusCode::BAD_REQUEST,
            // 400/422 for bad JSON, 413 for oversized bodies, 415 without a JSON content type
            ApiError::Body(rejection) => rejection.status(),
            ApiError::Service(ServiceError::ContractViolation(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::SessionLimit(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
