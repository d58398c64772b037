//! Server configuration from CLI flags and environment variables.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::cloudflare::CLOUDFLARE_API_BASE;

/// Default cap on simultaneously active configurations.
pub const DEFAULT_MAX_CONFIGS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "email-routing-manager")]
#[command(about = "Manage Cloudflare Email Routing rules across accounts", long_about = None)]
#[command(version)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8787")]
    pub listen_addr: String,

    /// SQLite database file
    #[arg(long, env = "DATABASE_PATH", default_value = "email-routing.db")]
    pub database_path: PathBuf,

    /// Maximum number of active Cloudflare configurations
    #[arg(long, env = "MAX_CONFIGS", default_value_t = DEFAULT_MAX_CONFIGS)]
    pub max_configs: usize,

    /// Cloudflare API base URL
    #[arg(long, env = "CLOUDFLARE_API_BASE", default_value = CLOUDFLARE_API_BASE)]
    pub cloudflare_api_base: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}
