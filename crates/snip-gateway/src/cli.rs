use clap::Parser;
use snip_storage::StorageSettings;
use snip_telemetry::LogFormat;
use std::path::PathBuf;

pub const SERVER_ADDRESS_ENV: &str = "SERVER_ADDRESS";
pub const BASE_URL_ENV: &str = "BASE_URL";
pub const FILE_STORAGE_PATH_ENV: &str = "FILE_STORAGE_PATH";
pub const DATABASE_DSN_ENV: &str = "DATABASE_DSN";
pub const SECRET_ENV: &str = "SECRET_URL_SERVICE";
pub const LOG_FORMAT_ENV: &str = "SNIP_LOG_FORMAT";
pub const DELETE_WORKERS_ENV: &str = "SNIP_DELETE_WORKERS";
pub const DELETE_QUEUE_CAPACITY_ENV: &str = "SNIP_DELETE_QUEUE_CAPACITY";

pub const DEFAULT_SERVER_ADDRESS: &str = "localhost:8080";
pub const DEFAULT_SECRET: &str = "change-me";
pub const DEFAULT_DELETE_WORKERS: usize = 4;
pub const DEFAULT_DELETE_QUEUE_CAPACITY: usize = 64;

fn positive(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(err) => Err(err.to_string()),
    }
}

#[derive(Debug, Parser)]
#[command(name = "snip-gateway", about = "URL shortener HTTP server")]
pub struct CLI {
    /// Address to listen on; an http:// or https:// prefix is ignored.
    #[arg(short = 'a', long, env = SERVER_ADDRESS_ENV, default_value = DEFAULT_SERVER_ADDRESS)]
    pub server_address: String,

    /// Prefix for returned short URLs. Empty means derive it from Host.
    #[arg(short = 'b', long, env = BASE_URL_ENV, default_value = "")]
    pub base_url: String,

    #[arg(short = 'f', long, env = FILE_STORAGE_PATH_ENV, default_value = "")]
    pub file_storage_path: String,

    #[arg(short = 'd', long, env = DATABASE_DSN_ENV, default_value = "", hide_env_values = true)]
    pub database_dsn: String,

    /// Key for signing the user cookie.
    #[arg(short = 's', long, env = SECRET_ENV, hide_env_values = true)]
    pub secret: Option<String>,

    #[arg(long, env = LOG_FORMAT_ENV, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[arg(long, env = DELETE_WORKERS_ENV, default_value_t = DEFAULT_DELETE_WORKERS, value_parser = positive)]
    pub delete_workers: usize,

    #[arg(
        long,
        env = DELETE_QUEUE_CAPACITY_ENV,
        default_value_t = DEFAULT_DELETE_QUEUE_CAPACITY,
        value_parser = positive
    )]
    pub delete_queue_capacity: usize,
}

impl CLI {
    /// The bind address with any scheme prefix removed.
    pub fn listen_address(&self) -> &str {
        let address = self.server_address.trim();
        address
            .strip_prefix("http://")
            .or_else(|| address.strip_prefix("https://"))
            .unwrap_or(address)
    }

    pub fn base_url(&self) -> Option<String> {
        let base = self.base_url.trim().trim_end_matches('/');
        (!base.is_empty()).then(|| base.to_string())
    }

    pub fn storage_settings(&self) -> StorageSettings {
        let dsn = self.database_dsn.trim();
        let path = self.file_storage_path.trim();
        StorageSettings {
            database_dsn: (!dsn.is_empty()).then(|| dsn.to_string()),
            file_path: (!path.is_empty()).then(|| PathBuf::from(path)),
        }
    }

    /// The signing secret and whether it fell back to the built-in default.
    pub fn secret(&self) -> (&str, bool) {
        match self.secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => (secret, false),
            None => (DEFAULT_SECRET, true),
        }
    }
}
