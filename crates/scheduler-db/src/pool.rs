use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteJournalMode};
use sqlx::{Executor, SqlitePool};
use tracing::info;

use crate::config::DbConfig;

/// Create a connection pool with sensible defaults.
///
/// Creates the backing file if it does not exist and enables WAL journaling
/// so readers are never blocked by the scheduler's writers.
pub async fn create_pool(config: &DbConfig) -> Result<SqlitePool> {
    let options: SqliteConnectOptions = config
        .database_url
        .parse()
        .with_context(|| format!("invalid database URL {}", config.database_url))?;

    let options = options
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
        .with_context(|| {
            format!("failed to connect to database at {}", config.database_url)
        })?;

    info!(url = %config.database_url, "WAL journal mode enabled");
    Ok(pool)
}

/// Run all pending migrations embedded in this crate against the pool.
///
/// Uses the compile-time `sqlx::migrate!()` macro, so the migration SQL is
/// baked into the binary and no source tree needs to be present at runtime.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("failed to run database migrations")?;

    info!("migrations applied successfully");
    Ok(())
}

/// Trivial round-trip used by the `/db-health` endpoint to verify the Store
/// is reachable.
pub async fn health_check(pool: &SqlitePool) -> Result<()> {
    pool.execute("SELECT 1").await.context("database health check failed")?;
    Ok(())
}

/// Return the row count for every user table in the database.
///
/// Used by startup logging to report the schema state.
pub async fn table_counts(pool: &SqlitePool) -> Result<Vec<(String, i64)>> {
    let tables: Vec<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx_%' \
         ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .context("failed to list tables")?;

    let mut counts = Vec::with_capacity(tables.len());
    for (table_name,) in &tables {
        // Table names come from sqlite_master so they are safe identifiers.
        let query = format!("SELECT COUNT(*) FROM {table_name}");
        let count: (i64,) = sqlx::query_as(&query)
            .fetch_one(pool)
            .await
            .with_context(|| format!("failed to count rows in {table_name}"))?;
        counts.push((table_name.clone(), count.0));
    }
    Ok(counts)
}

/// Return the default path to the migrations directory shipped with
/// `scheduler-db`. Exposed for tooling that wants to point a runtime
/// `Migrator` at the same files the embedded macro uses.
pub fn default_migrations_path() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/migrations"))
}
