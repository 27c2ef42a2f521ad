use thiserror::Error;
use crate::database::DatabaseError;

/// Error type for repository operations
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    /// Connection pool error
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Not found error
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(error: rusqlite::Error) -> Self {
        match &error {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation
                    && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                RepositoryError::Conflict(
                    message.clone().unwrap_or_else(|| "unique constraint failed".to_string()),
                )
            }
            _ => RepositoryError::Sqlite(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_unique_violation_maps_to_conflict() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE t (phone TEXT UNIQUE)", []).unwrap();
        conn.execute("INSERT INTO t VALUES ('1')", []).unwrap();

        let err: RepositoryError = conn.execute("INSERT INTO t VALUES ('1')", []).unwrap_err().into();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let err: RepositoryError = conn.execute("INSERT INTO missing VALUES (1)", []).unwrap_err().into();
        assert!(matches!(err, RepositoryError::Sqlite(_)));
    }
}
