//! Database schema definitions
//!
//! Timestamps are UTC. SQLite stores them as integer microseconds since the
//! epoch; MySQL uses `DATETIME(6)`.

/// SQLite: does the students table exist
pub const SQLITE_TABLE_EXISTS: &str =
    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'students'";

/// SQLite: the students table. AUTOINCREMENT keeps deleted ids from being reused.
pub const SQLITE_CREATE_STUDENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS students (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    address TEXT NOT NULL,
    city TEXT NOT NULL,
    state TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    phone TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
)
"#;

/// MySQL: does the students table exist in the current database
pub const MYSQL_TABLE_EXISTS: &str = "SELECT COUNT(*) FROM information_schema.tables \
     WHERE table_schema = DATABASE() AND table_name = 'students'";

/// MySQL: the students table, indexes inline
pub const MYSQL_CREATE_STUDENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS students (
    id BIGINT AUTO_INCREMENT PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    address VARCHAR(255) NOT NULL,
    city VARCHAR(100) NOT NULL,
    state VARCHAR(100) NOT NULL,
    email VARCHAR(255) NOT NULL UNIQUE,
    phone VARCHAR(20) NOT NULL,
    created_at DATETIME(6) NOT NULL,
    updated_at DATETIME(6) NOT NULL,
    INDEX idx_name (name),
    INDEX idx_email (email),
    INDEX idx_city (city)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci
"#;

/// SQLite lookup indexes
pub const SQLITE_CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_name ON students(name)",
    "CREATE INDEX IF NOT EXISTS idx_email ON students(email)",
    "CREATE INDEX IF NOT EXISTS idx_city ON students(city)",
];

/// Column list shared by every SELECT
pub const STUDENT_COLUMNS: &str =
    "id, name, address, city, state, email, phone, created_at, updated_at";

/// All SQLite schema creation statements
pub fn sqlite_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![SQLITE_CREATE_STUDENTS_TABLE];
    stmts.extend(SQLITE_CREATE_INDEXES.iter().copied());
    stmts
}

/// A sample row: (name, address, city, state, email, phone)
pub type SampleStudent = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
);

/// Rows inserted into a freshly created table
pub const SAMPLE_STUDENTS: &[SampleStudent] = &[
    ("John Doe", "Example Address", "Example City", "example State", "example@example.com", "9009009009"),
    ("Jane Smith", "123 Main Street", "Sydney", "NSW", "jane.smith@example.com", "0412345678"),
    ("Mike Johnson", "456 Park Avenue", "Melbourne", "VIC", "mike.johnson@example.com", "0423456789"),
    ("Sarah Williams", "789 Beach Road", "Brisbane", "QLD", "sarah.williams@example.com", "0434567890"),
    ("David Brown", "321 Mountain View", "Perth", "WA", "david.brown@example.com", "0445678901"),
    ("Emily Davis", "654 Lake Drive", "Adelaide", "SA", "emily.davis@example.com", "0456789012"),
    ("James Wilson", "987 Forest Lane", "Hobart", "TAS", "james.wilson@example.com", "0467890123"),
    ("Olivia Taylor", "147 River Road", "Canberra", "ACT", "olivia.taylor@example.com", "0478901234"),
    ("William Anderson", "258 Hill Street", "Darwin", "NT", "william.anderson@example.com", "0489012345"),
    ("Sophia Martinez", "369 Valley Court", "Gold Coast", "QLD", "sophia.martinez@example.com", "0490123456"),
];
