use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::storage::{BackendKind, StoreConfig, WaitPolicy};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub store: StoreConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let kind: BackendKind = env_or("PROJECTS_DB_KIND", "sqlite3")
            .parse()
            .map_err(|e| format!("Invalid PROJECTS_DB_KIND: {e}"))?;

        let host: IpAddr = env_or("PROJECTS_HOST", "127.0.0.1")
            .parse()
            .map_err(|e| format!("Invalid PROJECTS_HOST: {e}"))?;

        let port: u16 = env_or("PROJECTS_PORT", "5000")
            .parse()
            .map_err(|e| format!("Invalid PROJECTS_PORT: {e}"))?;

        let poll_ms: u64 = env_or("PROJECTS_TABLE_POLL_MS", "2000")
            .parse()
            .map_err(|e| format!("Invalid PROJECTS_TABLE_POLL_MS: {e}"))?;

        let poll_attempts: u32 = env_or("PROJECTS_TABLE_POLL_ATTEMPTS", "60")
            .parse()
            .map_err(|e| format!("Invalid PROJECTS_TABLE_POLL_ATTEMPTS: {e}"))?;

        let store = StoreConfig {
            kind,
            sqlite_path: PathBuf::from(env_or("PROJECTS_SQLITE_PATH", "db/sql3-database.sdb")),
            table_name: env_or("PROJECTS_TABLE_NAME", "projects"),
            region: env_or("PROJECTS_AWS_REGION", "eu-west-1"),
            endpoint_url: std::env::var("PROJECTS_DYNAMODB_ENDPOINT")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            wait: WaitPolicy {
                interval: Duration::from_millis(poll_ms),
                attempts: poll_attempts,
            },
        };

        Ok(Config {
            host,
            port,
            log_level: env_or("PROJECTS_LOG_LEVEL", "info"),
            store,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
