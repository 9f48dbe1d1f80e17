//! Long-running single producer that polls the Store for runnable tasks,
//! claims them, and hands them to the worker pool.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;

use scheduler_db::queries::tasks as task_db;

use crate::worker_pool::WorkerPool;

/// Run the scheduler loop until `cancel` fires.
///
/// Each iteration sizes a claim batch from the worker pool's remaining
/// capacity, claims and dispatches runnable tasks, then sleeps for
/// `poll_interval` (or until cancelled, whichever comes first). Errors in
/// the iteration body are logged and the loop continues on the next tick;
/// a Store outage manifests as periodic retry rather than a crash.
pub async fn run_scheduler_loop(
    pool: SqlitePool,
    worker_pool: Arc<WorkerPool>,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    loop {
        if cancel.is_cancelled() {
            tracing::info!("scheduler loop cancelled, exiting");
            return;
        }

        if let Err(e) = run_iteration(&pool, &worker_pool).await {
            tracing::error!(error = %e, "scheduler loop iteration failed");
        }

        tokio::select! {
            _ = tokio::time::sleep(poll_interval) => {}
            _ = cancel.cancelled() => {
                tracing::info!("scheduler loop cancelled during sleep, exiting");
                return;
            }
        }
    }
}

async fn run_iteration(pool: &SqlitePool, worker_pool: &WorkerPool) -> Result<()> {
    let available = worker_pool.available_slots();
    if available == 0 {
        return Ok(());
    }

    let runnable = task_db::find_runnable(pool, available as i64)
        .await
        .context("failed to query runnable tasks")?;

    for id in runnable {
        let claimed = task_db::claim_running(pool, &id)
            .await
            .with_context(|| format!("failed to claim task {id}"))?;
        if !claimed {
            tracing::debug!(task_id = %id, "claim lost to another claimant");
            continue;
        }

        let task = task_db::get_task(pool, &id)
            .await
            .with_context(|| format!("failed to fetch claimed task {id}"))?;
        let Some(task) = task else {
            tracing::warn!(task_id = %id, "claimed task vanished before dispatch");
            continue;
        };

        tracing::info!(task_id = %id, duration_ms = task.duration_ms, "dispatching claimed task");
        worker_pool.submit(id, task.duration_ms).await;
    }

    Ok(())
}
