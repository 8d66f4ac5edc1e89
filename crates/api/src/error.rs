//! HTTP mapping for application errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use shared::error::{AppError, ErrorCode};

/// Response wrapper for [`AppError`]. Handlers return
/// `Result<_, ApiError>` and use `?` on engine calls.
#[derive(Debug)]
pub struct ApiError(pub AppError);

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.code() {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // The system message may carry collaborator detail; it goes to the
        // log, while the response body only ever carries the user message.
        if self.0.is_internal() {
            tracing::error!("Internal error: {}", self.0.system_message());
        }

        let body = ErrorBody {
            error: self.0.code().to_string(),
            message: self.0.user_message().to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}
