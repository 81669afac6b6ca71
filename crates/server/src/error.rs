use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::{
    DbErr,
    models::{task::TaskError, user::UserError},
};
use tasks::ValidationError;
use thiserror::Error;
use utils::response::ApiResponse;
use utils_jwt::TokenError;

use crate::routes::auth::CredentialError;

#[derive(Debug, Error, ts_rs::TS)]
#[ts(type = "string")]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = match &self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "ValidationError"),
            ApiError::Credential(_) => (StatusCode::BAD_REQUEST, "CredentialError"),
            ApiError::User(err) => match err {
                UserError::EmailTaken => (StatusCode::BAD_REQUEST, "UserError"),
                UserError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "UserError"),
            },
            ApiError::Task(err) => match err {
                TaskError::TaskNotFound => (StatusCode::NOT_FOUND, "TaskError"),
                TaskError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "TaskError"),
            },
            ApiError::Token(err) => match err {
                TokenError::Invalid => (StatusCode::UNAUTHORIZED, "TokenError"),
                TokenError::Mint(_) => (StatusCode::INTERNAL_SERVER_ERROR, "TokenError"),
            },
            ApiError::Database(db_err) => match db_err {
                DbErr::RecordNotFound(_) => (StatusCode::NOT_FOUND, "DatabaseError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            },
            ApiError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "InvalidCredentials"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        };

        // 4xx messages are user-correctable and pass through; 5xx detail
        // stays in the log.
        let error_message = match &self {
            ApiError::Validation(err) => err.to_string(),
            ApiError::Credential(err) => err.to_string(),
            ApiError::User(UserError::EmailTaken) => self.to_string(),
            ApiError::Task(TaskError::TaskNotFound) => self.to_string(),
            ApiError::Token(TokenError::Invalid) | ApiError::Unauthorized => {
                "Unauthorized. Please sign in again.".to_string()
            }
            ApiError::InvalidCredentials => self.to_string(),
            ApiError::Database(DbErr::RecordNotFound(_)) => "Not found".to_string(),
            _ => "Internal server error".to_string(),
        };

        if status_code.is_server_error() {
            tracing::error!(
                status = %status_code,
                error_type,
                error = %self,
                "API request failed"
            );
        }
        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}
