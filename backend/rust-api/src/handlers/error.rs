use axum::{http::StatusCode, response::IntoResponse, Json};
use validator::ValidationErrors;

use crate::services::session_service::PracticeError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        ApiError::bad_request(format!("Validation error: {}", err))
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("Store failure: {:?}", err);
        ApiError::Internal(err.to_string())
    }
}

impl From<PracticeError> for ApiError {
    fn from(err: PracticeError) -> Self {
        match err {
            PracticeError::InvalidMode(_)
            | PracticeError::QuestionNotInSession(_)
            | PracticeError::AlreadyAnswered(_)
            | PracticeError::InvalidAnswerIndex { .. } => ApiError::bad_request(err.to_string()),
            PracticeError::UnknownSession(_) | PracticeError::UnknownQuestion(_) => {
                ApiError::not_found(err.to_string())
            }
            PracticeError::Store(inner) => inner.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        let json_response = serde_json::json!({
            "message": message,
            "status": status.as_u16()
        });
        (status, Json(json_response)).into_response()
    }
}
