use thiserror::Error;

// Database modules
pub mod connection;
pub mod migrations;
pub(crate) mod time;

// Re-export database connection types
pub use connection::*;

/// Database error enum
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Environment variable not found
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    /// SQLite error
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// SQLite connection pool error
    #[error("SQLite connection pool error: {0}")]
    SqlitePoolError(#[from] r2d2::Error),

    /// Unsupported database type
    #[error("Unsupported database type: {0}")]
    UnsupportedDatabaseType(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    ConfigError(String),

    /// Migration error
    #[error("Database migration error: {0}")]
    MigrationError(String),
}
