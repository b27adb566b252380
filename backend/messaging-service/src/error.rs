use crate::middleware::error_handling;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found")]
    NotFound,

    #[error("message already deleted")]
    AlreadyDeleted,

    #[error("messaging is closed for this conversation")]
    Locked,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        AppError::Forbidden(reason.into())
    }

    /// HTTP status code for this error per the platform taxonomy.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::InvalidInput(_) | AppError::AlreadyDeleted => 400,
            AppError::Unauthorized => 401,
            AppError::Forbidden(_) | AppError::Locked => 403,
            AppError::NotFound => 404,
            AppError::Config(_)
            | AppError::StartServer(_)
            | AppError::Database(_)
            | AppError::Internal => 500,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error_handling::into_response(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(AppError::InvalidInput("empty".into()).status_code(), 400);
        assert_eq!(AppError::Unauthorized.status_code(), 401);
        assert_eq!(AppError::forbidden("not a participant").status_code(), 403);
        assert_eq!(AppError::Locked.status_code(), 403);
        assert_eq!(AppError::NotFound.status_code(), 404);
        assert_eq!(AppError::AlreadyDeleted.status_code(), 400);
        assert_eq!(AppError::Internal.status_code(), 500);
    }
}
