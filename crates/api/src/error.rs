use axum::{Json, http::StatusCode, response::IntoResponse};
use lexohub_domain::error::DomainError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("request already acted on")]
    AlreadyActed,
    #[error("collaborator failure: {0}")]
    CollaboratorFailure(String),
    #[error("storage unavailable")]
    StorageUnavailable,
    #[error("internal error")]
    Internal,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::AlreadyActed => StatusCode::CONFLICT,
            ApiError::CollaboratorFailure(_) => StatusCode::BAD_GATEWAY,
            ApiError::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::Unauthorized => "unauthorized",
            ApiError::Forbidden => "forbidden",
            ApiError::NotFound => "not_found",
            ApiError::AlreadyActed => "already_acted",
            ApiError::CollaboratorFailure(_) => "collaborator_failure",
            ApiError::StorageUnavailable => "storage_unavailable",
            ApiError::Internal => "internal_error",
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation { .. } => ApiError::Validation(err.to_string()),
            DomainError::NotFound => ApiError::NotFound,
            DomainError::AlreadyActed => ApiError::AlreadyActed,
            DomainError::Forbidden => ApiError::Forbidden,
            DomainError::Collaborator(message) => ApiError::CollaboratorFailure(message),
            DomainError::Storage(message) => {
                tracing::error!(error = %message, "storage fault");
                ApiError::StorageUnavailable
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let message = self.to_string();
        let body = ErrorEnvelope {
            error: ErrorBody {
                code: self.error_code(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}
