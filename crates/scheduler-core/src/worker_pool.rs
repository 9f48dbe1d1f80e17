//! Bounded pool of executors that run a claimed task's simulated body and
//! report terminal status back to the Store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

use scheduler_db::queries::tasks as task_db;

/// Bounded pool of `capacity` concurrent task executions.
///
/// Concurrency is admitted by a counting semaphore over spawned async
/// tasks, not a fixed set of OS threads. Callers (the scheduler loop) size
/// their claim batches using [`WorkerPool::available_slots`], which tracks
/// in-flight work as `submitted - terminated` rather than reading queue
/// depth, so actively-running tasks are never undercounted.
pub struct WorkerPool {
    pool: SqlitePool,
    semaphore: Arc<Semaphore>,
    capacity: usize,
    submitted: Arc<AtomicU64>,
    terminated: Arc<AtomicU64>,
    tasks: Mutex<JoinSet<()>>,
}

impl WorkerPool {
    pub fn new(pool: SqlitePool, capacity: usize) -> Self {
        Self {
            pool,
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            submitted: Arc::new(AtomicU64::new(0)),
            terminated: Arc::new(AtomicU64::new(0)),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Remaining capacity, computed as `capacity - (submitted - terminated)`.
    pub fn available_slots(&self) -> usize {
        let submitted = self.submitted.load(Ordering::SeqCst);
        let terminated = self.terminated.load(Ordering::SeqCst);
        let in_flight = submitted.saturating_sub(terminated);
        (self.capacity as u64).saturating_sub(in_flight) as usize
    }

    /// Accept a claimed task for execution.
    ///
    /// Acquires a semaphore permit (blocking only if the caller oversubmits
    /// past what [`available_slots`] reported), then spawns the execution.
    pub async fn submit(&self, id: String, duration_ms: i64) {
        let permit = match Arc::clone(&self.semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return,
        };

        self.submitted.fetch_add(1, Ordering::SeqCst);

        let pool = self.pool.clone();
        let terminated = Arc::clone(&self.terminated);

        let mut tasks = self.tasks.lock().await;
        tasks.spawn(async move {
            execute(&pool, &id, duration_ms).await;
            terminated.fetch_add(1, Ordering::SeqCst);
            drop(permit);
        });
    }

    /// Stop accepting work conceptually and wait for in-flight executions
    /// to reach a terminal status, bounded by `drain_timeout`.
    pub async fn shutdown(&self, drain_timeout: Duration) {
        let mut tasks = self.tasks.lock().await;
        let deadline = tokio::time::Instant::now() + drain_timeout;

        while !tasks.is_empty() {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(_)) => continue,
                _ => {
                    tracing::warn!(
                        remaining = tasks.len(),
                        "worker pool drain timeout expired with tasks still in flight"
                    );
                    break;
                }
            }
        }
    }
}

/// Run a single claimed task's body and write its terminal status.
///
/// The current workload is a simulated sleep with no failure path; a
/// production deployment would dispatch to a type-specific handler keyed
/// by `task.type` here instead, which is why the success/failure branches
/// below are both kept live rather than collapsed to a single write.
async fn execute(pool: &SqlitePool, id: &str, duration_ms: i64) {
    tokio::time::sleep(Duration::from_millis(duration_ms.max(0) as u64)).await;

    let outcome: Result<(), anyhow::Error> = Ok(());

    match outcome {
        Ok(()) => {
            if let Err(e) = task_db::mark_completed(pool, id).await {
                tracing::error!(
                    task_id = id,
                    error = %e,
                    "failed to write COMPLETED status; task remains RUNNING until next recovery"
                );
            }
        }
        Err(e) => {
            tracing::warn!(task_id = id, error = %e, "task execution failed");
            if let Err(write_err) = task_db::mark_failed(pool, id).await {
                tracing::error!(
                    task_id = id,
                    error = %write_err,
                    "failed to write FAILED status; task remains RUNNING until next recovery"
                );
            }
        }
    }
}
