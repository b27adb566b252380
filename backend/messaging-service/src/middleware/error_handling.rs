use crate::error::AppError;
use axum::{http::StatusCode, response::IntoResponse, Json};
use error_types::{error_codes, ErrorResponse};

/// Map domain errors to the platform's wire error envelope.
pub fn map_error(err: &AppError) -> (StatusCode, ErrorResponse) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let (error_type, code) = match err {
        AppError::InvalidInput(_) => ("validation_error", error_codes::INVALID_INPUT),
        AppError::Unauthorized => ("authentication_error", error_codes::UNAUTHENTICATED),
        AppError::Forbidden(_) => ("authorization_error", error_codes::FORBIDDEN),
        AppError::Locked => ("authorization_error", error_codes::CONVERSATION_LOCKED),
        AppError::NotFound => ("not_found_error", error_codes::NOT_FOUND),
        AppError::AlreadyDeleted => ("conflict_error", error_codes::MESSAGE_ALREADY_DELETED),
        AppError::Database(_) => ("server_error", error_codes::DATABASE_ERROR),
        AppError::Config(_) | AppError::StartServer(_) | AppError::Internal => {
            ("server_error", error_codes::INTERNAL_SERVER_ERROR)
        }
    };

    // 5xx detail stays server-side; clients get the generic line
    let message = if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
        "internal server error".to_string()
    } else {
        err.to_string()
    };

    let title = match status {
        StatusCode::BAD_REQUEST => "Bad Request",
        StatusCode::UNAUTHORIZED => "Unauthorized",
        StatusCode::FORBIDDEN => "Forbidden",
        StatusCode::NOT_FOUND => "Not Found",
        StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
        _ => "Error",
    };

    let response = ErrorResponse::new(title, &message, status.as_u16(), error_type, code);
    (status, response)
}

pub fn into_response(err: AppError) -> impl IntoResponse {
    let (status, response) = map_error(&err);
    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_maps_to_403_with_its_own_code() {
        let (status, response) = map_error(&AppError::Locked);
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(response.code, error_codes::CONVERSATION_LOCKED);
    }

    #[test]
    fn double_delete_maps_to_400_conflict() {
        let (status, response) = map_error(&AppError::AlreadyDeleted);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response.error_type, "conflict_error");
    }

    #[test]
    fn database_errors_hide_detail_from_clients() {
        let (status, response) = map_error(&AppError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.message, "internal server error");
    }
}
