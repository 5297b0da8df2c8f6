//! MySQL storage implementation

use std::time::Duration;
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use sqlx::Row;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use crate::{Error, Result};
use crate::config::StoreConfig;
use crate::record::{StudentFields, StudentRecord};
use super::{RecordStore, SchemaReport, like_pattern, schema};

/// MySQL-backed record store over a sqlx connection pool.
///
/// The pool connects lazily and tests each connection before handing it out,
/// so dropped connections are replaced transparently.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
    seed: bool,
}

impl MySqlStore {
    /// Build the pool without connecting. Must be called inside a tokio runtime.
    pub fn connect_lazy(config: &StoreConfig) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let pool = MySqlPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.pool_timeout_secs))
            .test_before_acquire(true)
            .connect_lazy_with(options);

        tracing::debug!(
            "MySQL pool configured for {}@{}:{}/{} (max {} connections)",
            config.user,
            config.host,
            config.port,
            config.database,
            config.pool_size
        );
        Self { pool, seed: true }
    }

    /// Whether `init_schema` inserts sample records into a new table
    pub fn with_seed(mut self, seed: bool) -> Self {
        self.seed = seed;
        self
    }

    async fn seed_sample_data(&self) -> Result<usize> {
        tracing::info!("Inserting sample student data");
        let now = now();
        let mut tx = self.pool.begin().await.map_err(classify)?;
        for &(name, address, city, state, email, phone) in schema::SAMPLE_STUDENTS {
            sqlx::query(
                "INSERT INTO students (name, address, city, state, email, phone, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(name)
            .bind(address)
            .bind(city)
            .bind(state)
            .bind(email)
            .bind(phone)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;
        }
        tx.commit().await.map_err(classify)?;
        tracing::info!("Sample data inserted successfully");
        Ok(schema::SAMPLE_STUDENTS.len())
    }
}

#[async_trait]
impl RecordStore for MySqlStore {
    async fn init_schema(&self) -> Result<SchemaReport> {
        let existed: i64 = sqlx::query_scalar(schema::MYSQL_TABLE_EXISTS)
            .fetch_one(&self.pool)
            .await
            .map_err(classify)
            .inspect_err(|e| tracing::error!("Error initializing database: {}", e))?;

        sqlx::query(schema::MYSQL_CREATE_STUDENTS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(classify)
            .inspect_err(|e| tracing::error!("Error initializing database: {}", e))?;
        tracing::info!("Database schema initialized successfully");

        let mut report = SchemaReport { created: existed == 0, seeded: 0 };
        if report.created && self.seed {
            report.seeded = self.seed_sample_data().await?;
        }
        Ok(report)
    }

    async fn list_all(&self) -> Result<Vec<StudentRecord>> {
        let sql = format!("SELECT {} FROM students ORDER BY name ASC, id ASC", schema::STUDENT_COLUMNS);
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(classify)
            .inspect_err(|e| tracing::error!("Error retrieving students: {}", e))?;

        let students = rows.iter().map(row_to_record).collect::<sqlx::Result<Vec<_>>>()?;
        tracing::info!("Retrieved {} students", students.len());
        Ok(students)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<StudentRecord>> {
        let sql = format!("SELECT {} FROM students WHERE id = ?", schema::STUDENT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)
            .inspect_err(|e| tracing::error!("Error retrieving student {}: {}", id, e))?;

        Ok(row.as_ref().map(row_to_record).transpose()?)
    }

    async fn add(&self, fields: &StudentFields) -> Result<i64> {
        fields.validate()?;
        let now = now();

        let result = sqlx::query(
            "INSERT INTO students (name, address, city, state, email, phone, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(fields.name.as_str())
        .bind(fields.address.as_str())
        .bind(fields.city.as_str())
        .bind(fields.state.as_str())
        .bind(fields.email.as_str())
        .bind(fields.phone.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, &fields.email))
        .inspect_err(|e| tracing::error!("Error adding student: {}", e))?;

        let id = result.last_insert_id() as i64;
        tracing::info!("Student added successfully with ID: {}", id);
        Ok(id)
    }

    async fn update(&self, id: i64, fields: &StudentFields) -> Result<bool> {
        fields.validate()?;

        // updated_at always changes, so an existing row is always counted as affected.
        let result = sqlx::query(
            "UPDATE students \
             SET name = ?, address = ?, city = ?, state = ?, email = ?, phone = ?, \
                 updated_at = GREATEST(?, updated_at + INTERVAL 1 MICROSECOND) \
             WHERE id = ?",
        )
        .bind(fields.name.as_str())
        .bind(fields.address.as_str())
        .bind(fields.city.as_str())
        .bind(fields.state.as_str())
        .bind(fields.email.as_str())
        .bind(fields.phone.as_str())
        .bind(now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, &fields.email))
        .inspect_err(|e| tracing::error!("Error updating student {}: {}", id, e))?;

        if result.rows_affected() > 0 {
            tracing::info!("Student {} updated successfully", id);
            Ok(true)
        } else {
            tracing::warn!("Student {} not found", id);
            Ok(false)
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM students WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(classify)
            .inspect_err(|e| tracing::error!("Error deleting student {}: {}", id, e))?;

        if result.rows_affected() > 0 {
            tracing::info!("Student {} deleted successfully", id);
            Ok(true)
        } else {
            tracing::warn!("Student {} not found", id);
            Ok(false)
        }
    }

    async fn search(&self, term: &str) -> Result<Vec<StudentRecord>> {
        let pattern = like_pattern(term);
        let sql = format!(
            "SELECT {} FROM students \
             WHERE name LIKE ? OR email LIKE ? OR city LIKE ? \
             ORDER BY name ASC, id ASC",
            schema::STUDENT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(pattern.as_str())
            .bind(pattern.as_str())
            .bind(pattern.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(classify)
            .inspect_err(|e| tracing::error!("Error searching students: {}", e))?;

        let students = rows.iter().map(row_to_record).collect::<sqlx::Result<Vec<_>>>()?;
        tracing::info!("Search returned {} results", students.len());
        Ok(students)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(classify)?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "mysql"
    }
}

/// Current time at the column's microsecond precision
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn row_to_record(row: &MySqlRow) -> sqlx::Result<StudentRecord> {
    Ok(StudentRecord {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        city: row.try_get("city")?,
        state: row.try_get("state")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Map an insert/update failure, turning a unique violation into `Conflict`
fn write_error(err: sqlx::Error, email: &str) -> Error {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return Error::Conflict(email.to_string());
        }
    }
    classify(err)
}

/// Surface connectivity failures as `StoreUnavailable`
fn classify(err: sqlx::Error) -> Error {
    match err {
        err @ (sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed) => Error::StoreUnavailable(err.to_string()),
        other => Error::MySql(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreBackend;

    fn unreachable_config() -> StoreConfig {
        StoreConfig {
            backend: StoreBackend::MySql,
            host: "127.0.0.1".to_string(),
            port: 1,
            pool_timeout_secs: 1,
            ..StoreConfig::default()
        }
    }

    #[tokio::test]
    async fn test_connect_lazy_does_not_connect() {
        let store = MySqlStore::connect_lazy(&unreachable_config());
        assert_eq!(store.backend(), "mysql");
        assert_eq!(store.pool.size(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        let store = MySqlStore::connect_lazy(&unreachable_config());

        assert!(matches!(store.ping().await, Err(Error::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_validation_precedes_connection() {
        let store = MySqlStore::connect_lazy(&unreachable_config());
        let fields = StudentFields::new("Ana", "1 St", "X", "Y", "", "123");

        assert!(matches!(store.add(&fields).await, Err(Error::Validation("email"))));
        assert!(matches!(store.update(1, &fields).await, Err(Error::Validation("email"))));
    }

    #[test]
    fn test_classify() {
        assert!(matches!(classify(sqlx::Error::PoolTimedOut), Error::StoreUnavailable(_)));
        assert!(matches!(classify(sqlx::Error::RowNotFound), Error::MySql(_)));
        assert!(matches!(
            write_error(sqlx::Error::PoolClosed, "a@b.com"),
            Error::StoreUnavailable(_)
        ));
    }
}
