//! Student records CLI - run the HTTP service or inspect the store

use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use student_records::config::AppConfig;
use student_records::storage::{open_store, RecordStore};
use student_records::ui::{self, Icons};
use student_records::{StoreBackend, StudentRecord};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "students")]
#[command(version)]
#[command(about = "Student record keeping service - JSON API and HTML views over a relational store")]
#[command(long_about = r#"
Manages student contact records in SQLite or MySQL and serves them over HTTP.

Example usage:
  students serve --port 8080
  students --backend mysql init
  students search --term sydney
  students show --id 3 --json
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a TOML config file (defaults to students.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Storage backend
    #[arg(long, global = true, value_enum)]
    backend: Option<StoreBackend>,

    /// Path to the SQLite database file
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the schema and run the HTTP server
    Serve {
        /// Listen address
        #[arg(long)]
        host: Option<String>,

        /// Listen port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create the students table and indexes if absent
    Init,

    /// List all students by name
    List,

    /// Find students whose name, email or city contains a term
    Search {
        /// Case-insensitive substring
        #[arg(short, long)]
        term: String,
    },

    /// Show a single student
    Show {
        /// Student id
        #[arg(short, long)]
        id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(backend) = cli.backend {
        config.store.backend = backend;
    }
    if let Some(database) = cli.database {
        config.store.sqlite_path = database;
    }
    if let Commands::Serve { host, port } = &cli.command {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
    }

    // Initialize logging
    let level = if cli.verbose || config.server.debug {
        "debug"
    } else if matches!(cli.command, Commands::Serve { .. }) {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let store = open_store(&config.store);

    match cli.command {
        Commands::Serve { .. } => {
            ui::header("Student Records");
            ui::info("Database", &config.store.describe());

            let report = store.init_schema().await?;
            tracing::info!("Schema ready: {}", report);

            student_records::server::start_server(&config.server, store).await?;
        }

        Commands::Init => {
            let report = store.init_schema().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&json!({"success": true, "data": report}))?);
            } else {
                ui::success(&format!("{} {}", Icons::DATABASE, report));
                ui::summary_row("Database:", &config.store.describe());
            }
        }

        Commands::List => {
            let students = store.list_all().await?;
            print_students(&students, cli.json)?;
        }

        Commands::Search { term } => {
            if !cli.json {
                println!("{} Searching for: '{}'...", Icons::SEARCH, term);
            }
            let students = store.search(&term).await?;
            print_students(&students, cli.json)?;
        }

        Commands::Show { id } => {
            let Some(student) = store.get_by_id(id).await? else {
                if cli.json {
                    println!("{}", json!({"success": false, "error": "Student not found"}));
                } else {
                    ui::error(&format!("Student {} not found", id));
                }
                std::process::exit(1);
            };

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&json!({"success": true, "data": student}))?);
            } else {
                print_student(&student);
            }
        }
    }

    Ok(())
}

fn print_students(students: &[StudentRecord], as_json: bool) -> anyhow::Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(&json!({"success": true, "data": students}))?);
        return Ok(());
    }

    if students.is_empty() {
        ui::warn("No students found.");
    } else {
        println!("{}", ui::student_table(students));
        ui::summary_row("Total:", &students.len().to_string());
    }
    Ok(())
}

fn print_student(student: &StudentRecord) {
    ui::section(&format!(" {} {} ", Icons::PERSON, student.name));
    ui::summary_row("ID:", &student.id.to_string());
    ui::summary_row("Email:", &student.email);
    ui::summary_row("Phone:", &student.phone);
    ui::summary_row("Address:", &format!("{}, {}, {}", student.address, student.city, student.state));
    ui::summary_row("Created:", &student.created_at.to_rfc3339());
    ui::summary_row("Updated:", &student.updated_at.to_rfc3339());
}
