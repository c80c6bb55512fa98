//! Sentinel server: process entry point.
//!
//! Connects to SurrealDB and brings the schema up to date. HTTP routing is
//! mounted by the embedding deployment.

use std::process::ExitCode;

use clap::Parser;
use sentinel_db::{DbConfig, DbManager};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Command line and environment configuration.
#[derive(Debug, Parser)]
#[command(name = "sentinel", version, about = "Sentinel identity core")]
struct Cli {
    /// SurrealDB WebSocket address.
    #[arg(long = "db-url", env = "SENTINEL_DB_URL", default_value = "127.0.0.1:8000")]
    db_url: String,

    #[arg(long = "db-namespace", env = "SENTINEL_DB_NAMESPACE", default_value = "sentinel")]
    db_namespace: String,

    #[arg(long = "db-database", env = "SENTINEL_DB_DATABASE", default_value = "main")]
    db_database: String,

    #[arg(long = "db-username", env = "SENTINEL_DB_USERNAME", default_value = "root")]
    db_username: String,

    #[arg(
        long = "db-password",
        env = "SENTINEL_DB_PASSWORD",
        default_value = "root",
        hide_env_values = true
    )]
    db_password: String,
}

impl Cli {
    fn db_config(&self) -> DbConfig {
        DbConfig {
            url: self.db_url.clone(),
            namespace: self.db_namespace.clone(),
            database: self.db_database.clone(),
            username: self.db_username.clone(),
            password: self.db_password.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sentinel=info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    info!(version = env!("CARGO_PKG_VERSION"), "Starting Sentinel");

    let db = match DbManager::connect(&cli.db_config()).await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "database connection failed");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = db.migrate().await {
        error!(error = %e, "schema migration failed");
        return ExitCode::FAILURE;
    }
    info!(
        schema_version = sentinel_db::latest_version(),
        "database schema is up to date"
    );

    ExitCode::SUCCESS
}
