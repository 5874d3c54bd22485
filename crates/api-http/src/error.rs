//! AppError -> HTTP status mapping

use crate::types::ErrorResponse;
use axum::http::StatusCode;
use axum::Json;
use scribe_core::error::AppError;

/// Convert AppError to an HTTP error response.
pub fn to_http_error(err: AppError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, code) = match &err {
        AppError::Validation(_) | AppError::Domain(_) | AppError::Serialization(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR")
        }
        AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        AppError::Conflict(_) | AppError::InvalidState(_) => (StatusCode::CONFLICT, "CONFLICT"),
        AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DB_ERROR"),
        AppError::Llm(_) | AppError::Search(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
        AppError::Config(_) | AppError::Io(_) | AppError::Internal(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        }
    };

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            code: code.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_table() {
        let (status, _) = to_http_error(AppError::Validation("too short".into()));
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = to_http_error(AppError::NotFound("job".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = to_http_error(AppError::Conflict("already generating".into()));
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = to_http_error(AppError::Database("down".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "DB_ERROR");
    }
}
