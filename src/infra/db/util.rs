use sqlx::error::ErrorKind;

use crate::application::repos::RepoError;

/// Postgres SQLSTATE for malformed literals, e.g. a bad uuid.
const INVALID_TEXT_REPRESENTATION: &str = "22P02";
/// Postgres SQLSTATE raised when `statement_timeout` cancels a query.
const QUERY_CANCELED: &str = "57014";

/// Translates driver failures into the repository error vocabulary.
pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    let db = match err {
        sqlx::Error::RowNotFound => return RepoError::NotFound,
        sqlx::Error::PoolTimedOut => return RepoError::Timeout,
        sqlx::Error::Database(db) => db,
        other => return RepoError::from_persistence(other),
    };

    let message = db.message().to_string();
    match db.kind() {
        ErrorKind::UniqueViolation => RepoError::Duplicate {
            constraint: db.constraint().unwrap_or("unknown").to_string(),
        },
        ErrorKind::ForeignKeyViolation => RepoError::InvalidInput { message },
        ErrorKind::NotNullViolation | ErrorKind::CheckViolation => {
            RepoError::Integrity { message }
        }
        _ => match db.code().as_deref() {
            Some(INVALID_TEXT_REPRESENTATION) => RepoError::InvalidInput { message },
            Some(QUERY_CANCELED) => RepoError::Timeout,
            _ => RepoError::Persistence(message),
        },
    }
}
