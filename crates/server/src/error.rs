use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use services::services::leads::LeadError;
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Lead(#[from] LeadError),
    #[error("template error: {0}")]
    Render(#[from] askama::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("unauthorized")]
    Unauthorized,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Lead(LeadError::Invalid { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Lead(LeadError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Lead(LeadError::Conflict { .. }) => StatusCode::CONFLICT,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Lead(LeadError::Database(_))
            | ApiError::Render(_)
            | ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller; store internals stay in the logs.
    fn public_message(&self) -> String {
        match self {
            ApiError::Lead(LeadError::Database(_)) | ApiError::Database(_) => {
                "A database error occurred".to_string()
            }
            ApiError::Render(_) => "Failed to render page".to_string(),
            other => other.to_string(),
        }
    }

    /// Same status and message as the plain error response, with `data`
    /// attached as `error_data`.
    pub fn with_error_data<E: Serialize>(self, data: E) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = ApiResponse::<(), E>::error_with_data(&self.public_message(), data);
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = ApiResponse::<()>::error(&self.public_message());
        (status, Json(body)).into_response()
    }
}
