//! Startup recovery: reconcile tasks left `RUNNING` by a previous process.

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use scheduler_db::queries::tasks as task_db;

/// Reset every `RUNNING` task to `QUEUED`, restoring invariant I7 after an
/// unclean shutdown. Must run before the scheduler loop and worker pool
/// start accepting work.
pub async fn run_startup_recovery(pool: &SqlitePool) -> Result<u64> {
    let reset = task_db::reset_running_to_queued(pool)
        .await
        .context("failed to reset orphaned RUNNING tasks")?;

    tracing::info!(reset_count = reset, "startup recovery complete");
    Ok(reset)
}
