use std::env;
use std::path::{Path, PathBuf};

/// Database configuration.
///
/// Reads from the `DATABASE_URL` environment variable, falling back to
/// `sqlite://./tasks.db` when unset.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full SQLite connection URL, e.g. `sqlite://./tasks.db`.
    pub database_url: String,
}

impl DbConfig {
    /// The default connection URL used when no environment variable is set.
    pub const DEFAULT_URL: &str = "sqlite://./tasks.db";

    /// Build a config from the environment.
    ///
    /// Priority: `DATABASE_URL` env var, then the compile-time default.
    pub fn from_env() -> Self {
        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| Self::DEFAULT_URL.to_owned());
        Self { database_url }
    }

    /// Build a config from an explicit URL (useful for tests and CLI flags).
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// Extract the filesystem path backing this database, if the URL points
    /// at a local file rather than an in-memory database.
    ///
    /// Strips the `sqlite://` / `sqlite:` prefix understood by sqlx.
    pub fn file_path(&self) -> Option<PathBuf> {
        let rest = self
            .database_url
            .strip_prefix("sqlite://")
            .or_else(|| self.database_url.strip_prefix("sqlite:"))?;

        if rest.is_empty() || rest == ":memory:" {
            return None;
        }

        Some(Path::new(rest).to_path_buf())
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
