//! Shared test utilities for scheduler integration tests.
//!
//! Provides a throwaway SQLite database per test, backed by a temp file so
//! WAL mode behaves the same as it does in production (`:memory:` databases
//! cannot use WAL, and each in-memory connection would see a different
//! database anyway).

use scheduler_db::config::DbConfig;
use scheduler_db::pool::{self, create_pool};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Create a fresh, migrated SQLite database for a single test.
///
/// Returns the pool and the [`TempDir`] backing it. The directory is
/// deleted when the guard is dropped, so tests must keep it alive for as
/// long as the pool is in use:
///
/// ```ignore
/// let (pool, _guard) = create_test_store().await;
/// ```
pub async fn create_test_store() -> (SqlitePool, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir for test database");
    let db_path = dir.path().join("test.db");
    let url = format!("sqlite://{}", db_path.display());

    let config = DbConfig::new(url);
    let test_pool = create_pool(&config)
        .await
        .expect("failed to connect to temp test database");

    pool::run_migrations(&test_pool)
        .await
        .expect("migrations should succeed");

    (test_pool, dir)
}
