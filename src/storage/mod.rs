//! Storage Layer - relational persistence for student records
//!
//! One table, `students`, with indexes on name, email and city. Two backends
//! implement the same `RecordStore` contract:
//! - `SqliteStore`: embedded file (or in-memory) database via rusqlite
//! - `MySqlStore`: relational server via a lazily connected sqlx pool

pub mod schema;
pub mod sqlite;
pub mod mysql;

use std::sync::Arc;
use async_trait::async_trait;
use crate::Result;
use crate::config::{StoreBackend, StoreConfig};
use crate::record::{StudentFields, StudentRecord};

pub use sqlite::SqliteStore;
pub use mysql::MySqlStore;

/// Persistent CRUD and search access to student records.
///
/// Implementations own their connection state: it is established on first
/// use and re-established when a probe finds it dropped. Every write commits
/// immediately. Absent ids are not errors: lookups return `None` and
/// mutations return `false`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create the table and indexes if absent, seeding a fresh table.
    async fn init_schema(&self) -> Result<SchemaReport>;

    /// All records ordered by name ascending
    async fn list_all(&self) -> Result<Vec<StudentRecord>>;

    async fn get_by_id(&self, id: i64) -> Result<Option<StudentRecord>>;

    /// Insert a record and return its new id.
    ///
    /// Fails with `Conflict` when the email is already taken.
    async fn add(&self, fields: &StudentFields) -> Result<i64>;

    /// Overwrite every mutable field and advance `updated_at`.
    ///
    /// Returns whether a record with `id` existed.
    async fn update(&self, id: i64, fields: &StudentFields) -> Result<bool>;

    /// Hard delete. Returns whether a record with `id` existed.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Records whose name, email or city contains `term`, ignoring case,
    /// ordered by name. An empty term matches everything.
    async fn search(&self, term: &str) -> Result<Vec<StudentRecord>>;

    /// Probe the backend, reconnecting if needed
    async fn ping(&self) -> Result<()>;

    /// Short backend name for logs and health output
    fn backend(&self) -> &'static str;
}

/// Outcome of `RecordStore::init_schema`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct SchemaReport {
    /// The table did not exist before this call
    pub created: bool,
    /// Number of sample rows inserted
    pub seeded: usize,
}

impl std::fmt::Display for SchemaReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.created {
            write!(f, "created students table ({} sample records)", self.seeded)
        } else {
            write!(f, "students table already present")
        }
    }
}

/// Build the configured store. No connection is made until first use.
///
/// The MySQL pool must be built inside a tokio runtime.
pub fn open_store(config: &StoreConfig) -> Arc<dyn RecordStore> {
    let store: Arc<dyn RecordStore> = match config.backend {
        StoreBackend::Sqlite => Arc::new(SqliteStore::new(&config.sqlite_path).with_seed(config.seed)),
        StoreBackend::MySql => Arc::new(MySqlStore::connect_lazy(config).with_seed(config.seed)),
    };
    tracing::debug!("Configured {} record store", store.backend());
    store
}

/// Build a `LIKE` pattern matching `term` as a literal substring.
///
/// `\` is the escape character on both backends.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(""), "%%");
        assert_eq!(like_pattern("ann"), "%ann%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_schema_report_display() {
        let report = SchemaReport { created: true, seeded: 10 };
        assert_eq!(report.to_string(), "created students table (10 sample records)");
        assert_eq!(SchemaReport::default().to_string(), "students table already present");
    }
}
