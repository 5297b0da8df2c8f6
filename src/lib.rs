//! # Student Records
//!
//! CRUD record keeping for student contact records behind an HTTP API.
//!
//! The crate provides:
//! - `StudentRecord` / `StudentFields` value types with field validation
//! - A `RecordStore` trait with an embedded SQLite backend and a MySQL backend
//! - An axum router exposing the store as a JSON API plus minimal HTML views
//! - Layered configuration (defaults, TOML file, environment, CLI flags)

pub mod record;
pub mod storage;
pub mod server;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use record::{StudentFields, StudentRecord, REQUIRED_FIELDS};
pub use storage::{MySqlStore, RecordStore, SchemaReport, SqliteStore};
pub use config::{AppConfig, StoreBackend, StoreConfig};

/// Result type alias for store and configuration operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for store and configuration operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Missing required field: {0}")]
    Validation(&'static str),

    #[error("Invalid JSON body")]
    InvalidBody,

    #[error("A student with email {0} already exists")]
    Conflict(String),

    #[error("Database unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    MySql(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
