//! Database connection module for the VitalCare application
//!
//! Connections come from an r2d2 pool over SQLite. The pool is created once at
//! startup and handed to every repository explicitly.

use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use tracing::{error, info};

use super::migrations::run_sqlite_migrations;
use super::DatabaseError;

/// Supported database types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    /// SQLite database (file-based)
    Sqlite,
}

impl FromStr for DatabaseType {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(DatabaseType::Sqlite),
            _ => Err(DatabaseError::UnsupportedDatabaseType(s.to_string())),
        }
    }
}

/// Database connection pool
#[derive(Debug, Clone)]
pub enum DatabasePool {
    /// SQLite connection pool
    SQLite(Arc<r2d2::Pool<SqliteConnectionManager>>),
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database type
    pub db_type: DatabaseType,
    /// Path to SQLite database file
    pub sqlite_path: String,
    /// Maximum number of pooled connections
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: DatabaseType::Sqlite,
            sqlite_path: "data/vital_care.db".to_string(),
            max_connections: 10,
            timeout_seconds: 30,
        }
    }
}

impl DatabaseConfig {
    /// Create a new database configuration from environment variables
    pub fn from_env() -> Result<Self, DatabaseError> {
        let defaults = Self::default();

        let db_type = env::var("DB_TYPE")
            .unwrap_or_else(|_| "sqlite".to_string())
            .parse::<DatabaseType>()?;

        let sqlite_path = match env::var("DB_SQLITE_PATH") {
            Ok(path) => path,
            Err(_) => {
                let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());
                Path::new(&data_dir).join("vital_care.db").to_string_lossy().to_string()
            }
        };

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(defaults.max_connections);

        let timeout_seconds = env::var("DB_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(defaults.timeout_seconds);

        if max_connections == 0 {
            return Err(DatabaseError::ConfigError("DB_MAX_CONNECTIONS must be at least 1".to_string()));
        }

        info!(
            "Database configuration: type={:?}, path={}, max_connections={}, timeout={}s",
            db_type, sqlite_path, max_connections, timeout_seconds
        );

        Ok(DatabaseConfig {
            db_type,
            sqlite_path,
            max_connections,
            timeout_seconds,
        })
    }
}

impl DatabasePool {
    /// Open the configured database and bring its schema up to date
    pub fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        match config.db_type {
            DatabaseType::Sqlite => Self::connect_sqlite(config),
        }
    }

    fn connect_sqlite(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        info!("Initializing SQLite database at: {}", config.sqlite_path);

        if let Some(parent) = Path::new(&config.sqlite_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                info!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).map_err(|e| {
                    DatabaseError::ConfigError(format!("Failed to create {:?}: {}", parent, e))
                })?;
            }
        }

        let manager = SqliteConnectionManager::file(&config.sqlite_path)
            .with_flags(OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE)
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));

        let pool = r2d2::Pool::builder()
            .max_size(config.max_connections)
            .connection_timeout(Duration::from_secs(config.timeout_seconds))
            .build(manager)
            .map_err(|e| {
                error!("Failed to create SQLite connection pool: {}", e);
                DatabaseError::SqlitePoolError(e)
            })?;

        let pool = DatabasePool::SQLite(Arc::new(pool));
        pool.migrate()?;

        info!("SQLite connection pool created successfully");
        Ok(pool)
    }

    /// Create a private in-memory database, mostly for tests.
    ///
    /// Every SQLite in-memory connection is its own database, so the pool is
    /// capped at one connection that is never recycled.
    pub fn in_memory() -> Result<Self, DatabaseError> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));

        let pool = r2d2::Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connection_timeout(Duration::from_secs(5))
            .build(manager)?;

        let pool = DatabasePool::SQLite(Arc::new(pool));
        pool.migrate()?;
        Ok(pool)
    }

    /// Check out a connection from the pool
    pub fn get(&self) -> Result<PooledConnection<SqliteConnectionManager>, DatabaseError> {
        match self {
            DatabasePool::SQLite(pool) => Ok(pool.get()?),
        }
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        info!("Running database migrations");
        let conn = self.get()?;
        run_sqlite_migrations(&conn).map_err(DatabaseError::MigrationError)?;
        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Verify the database answers a trivial query
    pub fn ping(&self) -> Result<(), DatabaseError> {
        let conn = self.get()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    /// Describe the current database connection
    pub fn connection_info(&self) -> String {
        match self {
            DatabasePool::SQLite(pool) => {
                let location = match self.get() {
                    Ok(conn) => conn
                        .query_row("PRAGMA database_list", [], |row| row.get::<_, String>(2))
                        .map(|path| {
                            if path.is_empty() {
                                "SQLite in-memory database".to_string()
                            } else {
                                format!("SQLite database at {}", path)
                            }
                        })
                        .unwrap_or_else(|_| "SQLite database (path unknown)".to_string()),
                    Err(e) => {
                        error!("Failed to get SQLite connection: {}", e);
                        return format!("SQLite connection error: {}", e);
                    }
                };

                let state = pool.state();
                format!(
                    "{} (connections: active={}, idle={})",
                    location, state.connections, state.idle_connections
                )
            }
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn test_database_config_default() {
        let config = DatabaseConfig::default();
        assert_eq!(config.db_type, DatabaseType::Sqlite);
        assert_eq!(config.sqlite_path, "data/vital_care.db");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.timeout_seconds, 30);
    }

    #[test]
    fn test_database_type_from_str() {
        assert_eq!("sqlite".parse::<DatabaseType>().unwrap(), DatabaseType::Sqlite);
        assert_eq!("SQLite".parse::<DatabaseType>().unwrap(), DatabaseType::Sqlite);
        assert!("postgres".parse::<DatabaseType>().is_err());
    }

    #[test]
    fn test_in_memory_pool_is_migrated() {
        let pool = DatabasePool::in_memory().unwrap();
        pool.ping().unwrap();

        let conn = pool.get().unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
                 ('patients', 'doctors', 'appointments', 'health_records', 'notifications')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 5);
        drop(conn);

        assert!(pool.connection_info().contains("in-memory"));
    }

    #[test]
    fn test_file_pool_creates_parent_directory() {
        let dir = std::env::temp_dir().join(format!("vital_care_{}", uuid::Uuid::new_v4()));
        let config = DatabaseConfig {
            sqlite_path: dir.join("nested").join("test.db").to_string_lossy().to_string(),
            max_connections: 2,
            ..DatabaseConfig::default()
        };

        let pool = DatabasePool::connect(&config).unwrap();
        pool.ping().unwrap();
        assert!(dir.join("nested").exists());

        drop(pool);
        let _ = std::fs::remove_dir_all(dir);
    }
}
