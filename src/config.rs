// Runtime configuration: command-line flags with environment fallbacks

use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATABASE_PATH: &str = "brokerage.db";

#[derive(Debug, Clone, Parser)]
#[command(name = "brokerage-server", version, about = "Brokerage commission simulator API")]
pub struct ServerConfig {
    /// Interface to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    #[command(flatten)]
    pub storage: StorageConfig,

    /// tracing-subscriber filter directive, e.g. `info` or `brokerage_simulator=debug`
    #[arg(long, env = "LOG_FILTER", default_value = "info")]
    pub log_filter: String,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where the data lives; shared by the server and the admin CLI
#[derive(Debug, Clone, clap::Args)]
pub struct StorageConfig {
    /// SQLite file holding schemes, distributors and the commission split
    #[arg(long = "database", env = "DATABASE_PATH", default_value = DEFAULT_DATABASE_PATH)]
    pub database_path: PathBuf,

    /// Legacy SQLite file with a `commission_sharing` table, read once at bootstrap
    #[arg(long = "legacy-database", env = "LEGACY_DATABASE_PATH")]
    pub legacy_database_path: Option<PathBuf>,
}
