//! Process configuration, resolved once at startup.
//!
//! Resolution chain per setting: CLI flag > environment variable > default.
//! No hidden global config object; [`AppConfig`] is constructed once in
//! `main` and passed down as an explicit dependency.

use std::env;

use scheduler_db::config::DbConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_config: DbConfig,
    pub max_concurrent_tasks: usize,
    pub poll_interval_ms: u64,
    pub bind_addr: String,
}

impl AppConfig {
    pub const DEFAULT_MAX_CONCURRENT_TASKS: usize = 3;
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
    pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

    /// Resolve configuration using the chain: CLI flag > env var > default.
    pub fn resolve(cli_database_url: Option<&str>, cli_bind_addr: Option<&str>) -> Self {
        let database_url = cli_database_url
            .map(|s| s.to_string())
            .or_else(|| env::var("DATABASE_URL").ok())
            .unwrap_or_else(|| DbConfig::DEFAULT_URL.to_string());

        let max_concurrent_tasks = env::var("MAX_CONCURRENT_TASKS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(Self::DEFAULT_MAX_CONCURRENT_TASKS);

        let poll_interval_ms = env::var("SCHEDULER_POLL_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(Self::DEFAULT_POLL_INTERVAL_MS);

        let bind_addr = cli_bind_addr
            .map(|s| s.to_string())
            .or_else(|| env::var("BIND_ADDR").ok())
            .unwrap_or_else(|| Self::DEFAULT_BIND_ADDR.to_string());

        Self {
            db_config: DbConfig::new(database_url),
            max_concurrent_tasks,
            poll_interval_ms,
            bind_addr,
        }
    }

    /// Log level consumed as a `tracing` env-filter directive.
    pub fn log_level() -> String {
        env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string())
    }
}
