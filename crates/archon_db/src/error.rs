//! Storage failure taxonomy, mirrored onto [`archon_protocol::ErrorKind`].

use archon_protocol::ErrorKind;

pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl BackendError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BackendError::UniqueViolation(_) => ErrorKind::Conflict,
            BackendError::ForeignKeyViolation(_) => ErrorKind::Validation,
            BackendError::NotFound(_) => ErrorKind::NotFound,
            BackendError::Unavailable(_) => ErrorKind::StorageUnavailable,
            BackendError::InvalidInput(_) => ErrorKind::Validation,
            BackendError::Conflict(_) => ErrorKind::Conflict,
            BackendError::Sqlx(e) => classify_sqlx(e),
        }
    }
}

/// Maps a raw `sqlx::Error` onto our taxonomy by inspecting the database
/// error code, rather than surfacing driver errors raw to callers.
fn classify_sqlx(err: &sqlx::Error) -> ErrorKind {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.is_unique_violation() {
                ErrorKind::Conflict
            } else if db_err.is_foreign_key_violation() {
                ErrorKind::Validation
            } else {
                ErrorKind::Internal
            }
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => ErrorKind::StorageUnavailable,
        sqlx::Error::RowNotFound => ErrorKind::NotFound,
        _ => ErrorKind::Internal,
    }
}

/// Reclassifies a raw sqlx error into our named variants at the point
/// queries are issued, so callers match on `BackendError` instead of
/// re-deriving a kind from `sqlx::Error` every time.
pub fn from_sqlx(err: sqlx::Error, context: &str) -> BackendError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            BackendError::UniqueViolation(format!("{context}: {db_err}"))
        }
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            BackendError::ForeignKeyViolation(format!("{context}: {db_err}"))
        }
        sqlx::Error::RowNotFound => BackendError::NotFound(context.to_string()),
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
            BackendError::Unavailable(format!("{context}: {err}"))
        }
        _ => BackendError::Sqlx(err),
    }
}
