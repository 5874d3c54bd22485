// Storage error translation, shared across the adapters
//
// Classification goes through sqlx's driver-agnostic ErrorKind rather than
// raw SQLite result codes: constraint violations become Conflict (callers
// can act on them), everything else collapses into Database.

use scribe_core::error::AppError;
use sqlx::error::ErrorKind;

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.kind() {
            ErrorKind::UniqueViolation => {
                AppError::Conflict(format!("row already exists: {}", db_err.message()))
            }
            ErrorKind::ForeignKeyViolation => {
                AppError::Conflict(format!("referenced row is missing: {}", db_err.message()))
            }
            ErrorKind::NotNullViolation | ErrorKind::CheckViolation => {
                AppError::Database(format!("constraint rejected the write: {}", db_err.message()))
            }
            _ => AppError::Database(db_err.message().to_string()),
        },
        sqlx::Error::RowNotFound => AppError::NotFound("no matching row".to_string()),
        sqlx::Error::PoolTimedOut => {
            AppError::Database("timed out waiting for a connection".to_string())
        }
        _ => AppError::Database(err.to_string()),
    }
}
