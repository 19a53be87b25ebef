use std::path::PathBuf;

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("DB not ready after {attempts} attempts: {source}")]
    ConnectivityExhausted {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    #[error("Migration {version} failed: {source}")]
    Migration {
        version: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Migration file name is not valid UTF-8: {}", .0.display())]
    InvalidFileName(PathBuf),

    #[error("Advisory lock error: {0}")]
    Lock(#[source] sqlx::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
