//! SQLite storage implementation

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use crate::{Error, Result};
use crate::record::{StudentFields, StudentRecord};
use super::{RecordStore, SchemaReport, like_pattern, schema};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::File(path) => write!(f, "{}", path.display()),
            Location::Memory => write!(f, ":memory:"),
        }
    }
}

/// SQLite-backed record store.
///
/// Holds a single connection, opened on first use. Cloning is cheap and
/// shares the connection. Blocking calls run on the tokio blocking pool.
#[derive(Clone)]
pub struct SqliteStore {
    location: Location,
    conn: Arc<Mutex<Option<Connection>>>,
    seed: bool,
}

impl SqliteStore {
    /// Store backed by a database file. Nothing is opened until first use.
    pub fn new(path: &Path) -> Self {
        Self {
            location: Location::File(path.to_path_buf()),
            conn: Arc::new(Mutex::new(None)),
            seed: true,
        }
    }

    /// Open a database file now (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let store = Self::new(path);
        *store.conn.lock() = Some(store.connect()?);
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            location: Location::Memory,
            conn: Arc::new(Mutex::new(None)),
            seed: true,
        };
        *store.conn.lock() = Some(store.connect()?);
        Ok(store)
    }

    /// Whether `init_schema` inserts sample records into a new table
    pub fn with_seed(mut self, seed: bool) -> Self {
        self.seed = seed;
        self
    }

    fn connect(&self) -> Result<Connection> {
        let conn = match &self.location {
            Location::File(path) => Connection::open(path),
            Location::Memory => Connection::open_in_memory(),
        }
        .map_err(|e| {
            tracing::error!("Error connecting to SQLite at {}: {}", self.location, e);
            Error::StoreUnavailable(e.to_string())
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        tracing::info!("Database connection established ({})", self.location);
        Ok(conn)
    }

    /// Run `op` against the connection, opening it first if needed.
    ///
    /// A connectivity failure drops a file-backed connection so the next call
    /// reopens it. An in-memory connection is never dropped.
    fn with_conn<T>(&self, op: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let mut slot = self.conn.lock();
        if slot.is_none() {
            *slot = Some(self.connect()?);
        }
        let Some(conn) = slot.as_ref() else {
            return Err(Error::StoreUnavailable("no database connection".to_string()));
        };

        let result = op(conn).map_err(classify);
        if matches!(result, Err(Error::StoreUnavailable(_))) && matches!(self.location, Location::File(_)) {
            tracing::warn!("Dropping SQLite connection to {}", self.location);
            *slot = None;
        }
        result
    }

    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.with_conn(op))
            .await
            .map_err(|e| Error::StoreUnavailable(format!("database worker failed: {}", e)))?
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn init_schema(&self) -> Result<SchemaReport> {
        let seed = self.seed;
        self.run(move |conn| initialize_schema(conn, seed))
            .await
            .inspect_err(|e| tracing::error!("Error initializing database: {}", e))
    }

    async fn list_all(&self) -> Result<Vec<StudentRecord>> {
        let students = self
            .run(|conn| {
                let sql = format!("SELECT {} FROM students ORDER BY name ASC, id ASC", schema::STUDENT_COLUMNS);
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([], row_to_record)?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await
            .inspect_err(|e| tracing::error!("Error retrieving students: {}", e))?;

        tracing::info!("Retrieved {} students", students.len());
        Ok(students)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<StudentRecord>> {
        self.run(move |conn| {
            let sql = format!("SELECT {} FROM students WHERE id = ?1", schema::STUDENT_COLUMNS);
            conn.query_row(&sql, [id], row_to_record)
                .optional()
                .map_err(Into::into)
        })
        .await
        .inspect_err(|e| tracing::error!("Error retrieving student {}: {}", id, e))
    }

    async fn add(&self, fields: &StudentFields) -> Result<i64> {
        fields.validate()?;
        let fields = fields.clone();

        let id = self
            .run(move |conn| {
                let now = Utc::now().timestamp_micros();
                conn.execute(
                    r#"
                    INSERT INTO students (name, address, city, state, email, phone, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                    "#,
                    params![
                        fields.name,
                        fields.address,
                        fields.city,
                        fields.state,
                        fields.email,
                        fields.phone,
                        now,
                    ],
                )
                .map_err(|e| write_error(e, &fields.email))?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .inspect_err(|e| tracing::error!("Error adding student: {}", e))?;

        tracing::info!("Student added successfully with ID: {}", id);
        Ok(id)
    }

    async fn update(&self, id: i64, fields: &StudentFields) -> Result<bool> {
        fields.validate()?;
        let fields = fields.clone();

        let changed = self
            .run(move |conn| {
                let now = Utc::now().timestamp_micros();
                conn.execute(
                    r#"
                    UPDATE students
                    SET name = ?1, address = ?2, city = ?3, state = ?4,
                        email = ?5, phone = ?6, updated_at = MAX(?7, updated_at + 1)
                    WHERE id = ?8
                    "#,
                    params![
                        fields.name,
                        fields.address,
                        fields.city,
                        fields.state,
                        fields.email,
                        fields.phone,
                        now,
                        id,
                    ],
                )
                .map_err(|e| write_error(e, &fields.email))
            })
            .await
            .inspect_err(|e| tracing::error!("Error updating student {}: {}", id, e))?;

        if changed > 0 {
            tracing::info!("Student {} updated successfully", id);
            Ok(true)
        } else {
            tracing::warn!("Student {} not found", id);
            Ok(false)
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let removed = self
            .run(move |conn| Ok(conn.execute("DELETE FROM students WHERE id = ?1", [id])?))
            .await
            .inspect_err(|e| tracing::error!("Error deleting student {}: {}", id, e))?;

        if removed > 0 {
            tracing::info!("Student {} deleted successfully", id);
            Ok(true)
        } else {
            tracing::warn!("Student {} not found", id);
            Ok(false)
        }
    }

    async fn search(&self, term: &str) -> Result<Vec<StudentRecord>> {
        let pattern = like_pattern(term);

        let students = self
            .run(move |conn| {
                let sql = format!(
                    r"SELECT {} FROM students
                      WHERE name LIKE ?1 ESCAPE '\' OR email LIKE ?1 ESCAPE '\' OR city LIKE ?1 ESCAPE '\'
                      ORDER BY name ASC, id ASC",
                    schema::STUDENT_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([&pattern], row_to_record)?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await
            .inspect_err(|e| tracing::error!("Error searching students: {}", e))?;

        tracing::info!("Search returned {} results", students.len());
        Ok(students)
    }

    async fn ping(&self) -> Result<()> {
        let probe = |conn: &Connection| -> Result<()> {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        };

        match self.run(probe).await {
            // The failed probe dropped the connection; one retry reopens it.
            Err(Error::StoreUnavailable(_)) if matches!(self.location, Location::File(_)) => {
                self.run(probe).await
            }
            other => other,
        }
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

fn initialize_schema(conn: &Connection, seed: bool) -> Result<SchemaReport> {
    let existed: i64 = conn.query_row(schema::SQLITE_TABLE_EXISTS, [], |row| row.get(0))?;
    for stmt in schema::sqlite_schema_statements() {
        conn.execute(stmt, [])?;
    }
    tracing::info!("Database schema initialized successfully");

    let mut report = SchemaReport { created: existed == 0, seeded: 0 };
    if report.created && seed {
        tracing::info!("Inserting sample student data");
        let tx = conn.unchecked_transaction()?;
        {
            let now = Utc::now().timestamp_micros();
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO students (name, address, city, state, email, phone, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                "#,
            )?;
            for &(name, address, city, state, email, phone) in schema::SAMPLE_STUDENTS {
                stmt.execute(params![name, address, city, state, email, phone, now])?;
            }
        }
        tx.commit()?;
        report.seeded = schema::SAMPLE_STUDENTS.len();
        tracing::info!("Sample data inserted successfully");
    }
    Ok(report)
}

/// Helper to convert a row to a StudentRecord
fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<StudentRecord> {
    Ok(StudentRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        city: row.get(3)?,
        state: row.get(4)?,
        email: row.get(5)?,
        phone: row.get(6)?,
        created_at: timestamp(7, row.get(7)?)?,
        updated_at: timestamp(8, row.get(8)?)?,
    })
}

fn timestamp(column: usize, micros: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros).ok_or(rusqlite::Error::IntegralValueOutOfRange(column, micros))
}

/// Map an insert/update failure, turning a unique violation into `Conflict`.
///
/// `email` is the only unique column besides the primary key.
fn write_error(err: rusqlite::Error, email: &str) -> Error {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Error::Conflict(email.to_string())
        }
        _ => Error::Sqlite(err),
    }
}

/// Surface connectivity failures as `StoreUnavailable`.
///
/// Busy and locked errors are lock contention on a healthy connection and
/// pass through unchanged.
fn classify(err: Error) -> Error {
    match err {
        Error::Sqlite(rusqlite::Error::SqliteFailure(e, msg))
            if matches!(
                e.code,
                ErrorCode::CannotOpen | ErrorCode::NotADatabase | ErrorCode::SystemIoFailure
            ) =>
        {
            Error::StoreUnavailable(msg.unwrap_or_else(|| e.to_string()))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ana() -> StudentFields {
        StudentFields::new("Ana", "1 St", "X", "Y", "a@b.com", "123")
    }

    async fn empty_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap().with_seed(false);
        store.init_schema().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_crud_scenario() {
        let store = empty_store().await;

        let id = store.add(&ana()).await.unwrap();
        assert_eq!(id, 1);

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, 1);
        assert_eq!(all[0].fields(), ana());

        let mut moved = ana();
        moved.city = "Z".to_string();
        assert!(store.update(1, &moved).await.unwrap());
        assert_eq!(store.get_by_id(1).await.unwrap().unwrap().city, "Z");

        assert!(store.delete(1).await.unwrap());
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_then_get() {
        let store = empty_store().await;

        let id = store.add(&ana()).await.unwrap();
        let record = store.get_by_id(id).await.unwrap().unwrap();

        assert_eq!(record.id, id);
        assert_eq!(record.fields(), ana());
        assert_eq!(record.created_at, record.updated_at);
    }

    #[tokio::test]
    async fn test_update_advances_updated_at() {
        let store = empty_store().await;
        let id = store.add(&ana()).await.unwrap();
        let before = store.get_by_id(id).await.unwrap().unwrap();

        let mut changed = ana();
        changed.phone = "999".to_string();
        assert!(store.update(id, &changed).await.unwrap());
        let first = store.get_by_id(id).await.unwrap().unwrap();

        // Same values again, immediately: the timestamp still moves forward.
        assert!(store.update(id, &changed).await.unwrap());
        let second = store.get_by_id(id).await.unwrap().unwrap();

        assert_eq!(first.id, before.id);
        assert_eq!(first.created_at, before.created_at);
        assert_eq!(first.phone, "999");
        assert_eq!(first.name, before.name);
        assert!(first.updated_at > before.updated_at);
        assert!(second.updated_at > first.updated_at);
        assert_eq!(second.created_at, before.created_at);
    }

    #[tokio::test]
    async fn test_missing_ids_are_not_errors() {
        let store = empty_store().await;

        assert!(store.get_by_id(999).await.unwrap().is_none());
        assert!(!store.update(999, &ana()).await.unwrap());
        assert!(!store.delete(999).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let store = empty_store().await;
        let id = store.add(&ana()).await.unwrap();

        assert!(store.delete(id).await.unwrap());
        assert!(store.get_by_id(id).await.unwrap().is_none());
        assert!(!store.delete(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = empty_store().await;
        store.add(&ana()).await.unwrap();

        let mut twin = ana();
        twin.name = "Other".to_string();
        let err = store.add(&twin).await.unwrap_err();

        assert!(matches!(err, Error::Conflict(ref email) if email == "a@b.com"));
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_to_taken_email_conflicts() {
        let store = empty_store().await;
        store.add(&ana()).await.unwrap();
        let bob = StudentFields::new("Bob", "2 St", "X", "Y", "bob@b.com", "456");
        let bob_id = store.add(&bob).await.unwrap();

        let mut stolen = bob.clone();
        stolen.email = "a@b.com".to_string();
        let err = store.update(bob_id, &stolen).await.unwrap_err();

        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(store.get_by_id(bob_id).await.unwrap().unwrap().email, "bob@b.com");
    }

    #[tokio::test]
    async fn test_add_rejects_empty_field() {
        let store = empty_store().await;
        let mut fields = ana();
        fields.address.clear();

        assert!(matches!(store.add(&fields).await, Err(Error::Validation("address"))));
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ids_not_reused() {
        let store = empty_store().await;
        store.add(&ana()).await.unwrap();
        let second = store
            .add(&StudentFields::new("Bob", "2 St", "X", "Y", "bob@b.com", "456"))
            .await
            .unwrap();
        assert!(store.delete(second).await.unwrap());

        let third = store
            .add(&StudentFields::new("Cy", "3 St", "X", "Y", "cy@b.com", "789"))
            .await
            .unwrap();
        assert_eq!(third, second + 1);
    }

    #[tokio::test]
    async fn test_init_schema_seeds_once() {
        let store = SqliteStore::open_in_memory().unwrap();

        let first = store.init_schema().await.unwrap();
        assert_eq!(first, SchemaReport { created: true, seeded: 10 });

        let second = store.init_schema().await.unwrap();
        assert_eq!(second, SchemaReport { created: false, seeded: 0 });
        assert_eq!(store.list_all().await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_init_schema_creates_lookup_indexes() {
        let store = SqliteStore::open_in_memory().unwrap().with_seed(false);
        let index_names = |store: &SqliteStore| {
            store.with_conn(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master
                     WHERE type = 'index' AND tbl_name = 'students' AND name LIKE 'idx_%'
                     ORDER BY name",
                )?;
                let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
                Ok(names.collect::<rusqlite::Result<Vec<_>>>()?)
            })
        };

        store.init_schema().await.unwrap();
        assert_eq!(index_names(&store).unwrap(), vec!["idx_city", "idx_email", "idx_name"]);

        store.init_schema().await.unwrap();
        assert_eq!(index_names(&store).unwrap(), vec!["idx_city", "idx_email", "idx_name"]);
    }

    #[tokio::test]
    async fn test_emptied_table_is_not_reseeded() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.init_schema().await.unwrap();
        for record in store.list_all().await.unwrap() {
            store.delete(record.id).await.unwrap();
        }

        store.init_schema().await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.init_schema().await.unwrap();

        let names: Vec<String> = store.list_all().await.unwrap().into_iter().map(|r| r.name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names[0], "David Brown");
    }

    #[tokio::test]
    async fn test_empty_search_matches_list() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.init_schema().await.unwrap();

        assert_eq!(store.search("").await.unwrap(), store.list_all().await.unwrap());
    }

    #[tokio::test]
    async fn test_search_fields_ignoring_case() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.init_schema().await.unwrap();

        let by_city = store.search("SYDNEY").await.unwrap();
        assert_eq!(by_city.len(), 1);
        assert_eq!(by_city[0].name, "Jane Smith");

        let by_email = store.search("olivia.t").await.unwrap();
        assert_eq!(by_email.len(), 1);
        assert_eq!(by_email[0].city, "Canberra");

        // "QLD" is a state, which is not searched.
        assert!(store.search("QLD").await.unwrap().is_empty());

        let by_name = store.search("wil").await.unwrap();
        let names: Vec<&str> = by_name.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["James Wilson", "Sarah Williams", "William Anderson"]);
    }

    #[tokio::test]
    async fn test_search_wildcards_are_literal() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.init_schema().await.unwrap();

        assert!(store.search("%").await.unwrap().is_empty());
        assert!(store.search("_").await.unwrap().is_empty());

        store
            .add(&StudentFields::new("Under_Score", "1 St", "X", "Y", "u@b.com", "1"))
            .await
            .unwrap();
        assert_eq!(store.search("_").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_file_store_opens_lazily_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("students.db");

        let store = SqliteStore::new(&path).with_seed(false);
        assert!(!path.exists());
        store.init_schema().await.unwrap();
        let id = store.add(&ana()).await.unwrap();
        store.ping().await.unwrap();

        let reopened = SqliteStore::open(&path).unwrap();
        let report = reopened.init_schema().await.unwrap();
        assert!(!report.created);
        assert_eq!(reopened.get_by_id(id).await.unwrap().unwrap().fields(), ana());
    }

    #[tokio::test]
    async fn test_unopenable_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(&dir.path().join("missing").join("students.db"));

        assert!(matches!(store.ping().await, Err(Error::StoreUnavailable(_))));
        assert!(matches!(store.list_all().await, Err(Error::StoreUnavailable(_))));
    }

    fn failure(code: std::os::raw::c_int) -> Error {
        Error::Sqlite(rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), None))
    }

    #[test]
    fn test_classify_lock_contention_passes_through() {
        assert!(matches!(classify(failure(rusqlite::ffi::SQLITE_BUSY)), Error::Sqlite(_)));
        assert!(matches!(classify(failure(rusqlite::ffi::SQLITE_LOCKED)), Error::Sqlite(_)));
        assert!(matches!(classify(failure(rusqlite::ffi::SQLITE_CANTOPEN)), Error::StoreUnavailable(_)));
        assert!(matches!(classify(failure(rusqlite::ffi::SQLITE_NOTADB)), Error::StoreUnavailable(_)));
        assert!(matches!(classify(failure(rusqlite::ffi::SQLITE_IOERR)), Error::StoreUnavailable(_)));
    }

    #[test]
    fn test_busy_file_connection_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("students.db")).unwrap();

        let result: Result<()> = store.with_conn(|_| Err(failure(rusqlite::ffi::SQLITE_BUSY)));
        assert!(matches!(result, Err(Error::Sqlite(_))));
        assert!(store.conn.lock().is_some());

        let result: Result<()> = store.with_conn(|_| Err(failure(rusqlite::ffi::SQLITE_IOERR)));
        assert!(matches!(result, Err(Error::StoreUnavailable(_))));
        assert!(store.conn.lock().is_none());
    }
}
