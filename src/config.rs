//! Layered configuration: defaults, then a TOML file, then environment
//! variables. CLI flags are applied last by the binary.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use crate::{Error, Result};

/// Which `RecordStore` implementation to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Embedded database file
    #[default]
    Sqlite,
    /// MySQL server
    #[serde(rename = "mysql")]
    #[value(name = "mysql")]
    MySql,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Sqlite => "sqlite",
            StoreBackend::MySql => "mysql",
        }
    }
}

impl FromStr for StoreBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" | "file" => Ok(StoreBackend::Sqlite),
            "mysql" | "mariadb" => Ok(StoreBackend::MySql),
            _ => Err(Error::Config(format!("Unknown database backend: {}", s))),
        }
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Connection parameters handed to the record store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// SQLite database file
    pub sqlite_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub pool_size: u32,
    /// Seconds to wait for a pooled connection
    pub pool_timeout_secs: u64,
    /// Insert sample records when the table is first created
    pub seed: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            sqlite_path: PathBuf::from("ryde_university.db"),
            host: "localhost".to_string(),
            port: 3306,
            user: "ryde_user".to_string(),
            password: "ryde_password".to_string(),
            database: "ryde_university".to_string(),
            pool_size: 10,
            pool_timeout_secs: 30,
            seed: true,
        }
    }
}

impl StoreConfig {
    /// Connection target without credentials, for logs
    pub fn describe(&self) -> String {
        match self.backend {
            StoreBackend::Sqlite => format!("sqlite:{}", self.sqlite_path.display()),
            StoreBackend::MySql => format!(
                "mysql://{}@{}:{}/{}",
                self.user, self.host, self.port, self.database
            ),
        }
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub debug: bool,
    /// Directory served under `/static`
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            debug: false,
            static_dir: PathBuf::from("static"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
}

/// On-disk shape of the config file. Every key is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub server: FileServerConfig,
    pub database: FileDatabaseConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub debug: Option<bool>,
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileDatabaseConfig {
    pub backend: Option<StoreBackend>,
    pub path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub pool_size: Option<u32>,
    pub pool_timeout: Option<u64>,
    pub seed: Option<bool>,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("students.toml")
}

impl AppConfig {
    /// Defaults, overlaid with the config file (if present) and the process
    /// environment.
    ///
    /// An explicitly given `path` must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        let file_path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
        if file_path.exists() {
            let contents = std::fs::read_to_string(&file_path)?;
            config.apply_file(&contents)?;
            tracing::debug!("Loaded configuration from {}", file_path.display());
        } else if path.is_some() {
            return Err(Error::Config(format!(
                "config file not found: {}",
                file_path.display()
            )));
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay values from TOML text
    pub fn apply_file(&mut self, contents: &str) -> Result<()> {
        let file: FileConfig = toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))?;

        let server = file.server;
        if let Some(host) = server.host {
            self.server.host = host;
        }
        if let Some(port) = server.port {
            self.server.port = port;
        }
        if let Some(debug) = server.debug {
            self.server.debug = debug;
        }
        if let Some(dir) = server.static_dir {
            self.server.static_dir = dir;
        }

        let db = file.database;
        if let Some(backend) = db.backend {
            self.store.backend = backend;
        }
        if let Some(path) = db.path {
            self.store.sqlite_path = path;
        }
        if let Some(host) = db.host {
            self.store.host = host;
        }
        if let Some(port) = db.port {
            self.store.port = port;
        }
        if let Some(user) = db.user {
            self.store.user = user;
        }
        if let Some(password) = db.password {
            self.store.password = password;
        }
        if let Some(name) = db.name {
            self.store.database = name;
        }
        if let Some(size) = db.pool_size {
            self.store.pool_size = size;
        }
        if let Some(timeout) = db.pool_timeout {
            self.store.pool_timeout_secs = timeout;
        }
        if let Some(seed) = db.seed {
            self.store.seed = seed;
        }
        Ok(())
    }

    /// Overlay values from environment variables looked up through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some((_, v)) = lookup_either(&lookup, "APP_HOST", "FLASK_HOST") {
            self.server.host = v;
        }
        if let Some((key, v)) = lookup_either(&lookup, "APP_PORT", "FLASK_PORT") {
            self.server.port = parse_env(key, &v)?;
        }
        if let Some((key, v)) = lookup_either(&lookup, "APP_DEBUG", "FLASK_DEBUG") {
            self.server.debug = parse_bool(key, &v)?;
        }
        if let Some(v) = lookup("APP_STATIC_DIR") {
            self.server.static_dir = PathBuf::from(v);
        }

        if let Some(v) = lookup("DB_BACKEND") {
            self.store.backend = v.parse()?;
        }
        if let Some(v) = lookup("DB_PATH") {
            self.store.sqlite_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("DB_HOST") {
            self.store.host = v;
        }
        if let Some(v) = lookup("DB_PORT") {
            self.store.port = parse_env("DB_PORT", &v)?;
        }
        if let Some(v) = lookup("DB_USER") {
            self.store.user = v;
        }
        if let Some(v) = lookup("DB_PASSWORD") {
            self.store.password = v;
        }
        if let Some(v) = lookup("DB_NAME") {
            self.store.database = v;
        }
        if let Some(v) = lookup("DB_POOL_SIZE") {
            self.store.pool_size = parse_env("DB_POOL_SIZE", &v)?;
        }
        if let Some(v) = lookup("DB_POOL_TIMEOUT") {
            self.store.pool_timeout_secs = parse_env("DB_POOL_TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("DB_SEED") {
            self.store.seed = parse_bool("DB_SEED", &v)?;
        }
        Ok(())
    }
}

/// `primary` wins over its legacy `alias` when both are set
fn lookup_either<'k>(
    lookup: &impl Fn(&str) -> Option<String>,
    primary: &'k str,
    alias: &'k str,
) -> Option<(&'k str, String)> {
    lookup(primary)
        .map(|v| (primary, v))
        .or_else(|| lookup(alias).map(|v| (alias, v)))
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} has an invalid value: {}", key, value)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(Error::Config(format!("{} has an invalid value: {}", key, value))),
    }
}
