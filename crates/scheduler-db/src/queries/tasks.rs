//! Database query functions for the `tasks` and `task_dependencies` tables.
//!
//! These are the only entry points through which the rest of the system
//! touches durable task state. Every state transition here is expressed as
//! a single SQL statement (or a single transaction) so the Store's view
//! stays internally consistent under concurrency.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::warn;

use crate::models::{Task, TaskStatus};

/// Errors that can occur while writing to the Store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task {0:?} already exists")]
    AlreadyExists(String),

    #[error("dependency {0:?} does not exist")]
    MissingDependency(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Insert a new task row and its dependency edges atomically.
///
/// Fails with [`StoreError::AlreadyExists`] if `id` is already taken, or
/// [`StoreError::MissingDependency`] naming the first absent dependency id.
/// The pre-check above is also a TOCTOU window: if a concurrent caller wins
/// the race and inserts `id` first, the `INSERT` below hits a unique-constraint
/// violation, which is mapped back to [`StoreError::AlreadyExists`] too.
/// On any failure the transaction rolls back and no rows are persisted.
pub async fn insert_task(
    pool: &SqlitePool,
    id: &str,
    task_type: &str,
    duration_ms: i64,
    deps: &[String],
) -> Result<Task, StoreError> {
    let mut tx = pool.begin().await?;

    let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM tasks WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    if existing.is_some() {
        return Err(StoreError::AlreadyExists(id.to_owned()));
    }

    for dep_id in deps {
        let dep_exists: Option<(String,)> = sqlx::query_as("SELECT id FROM tasks WHERE id = ?")
            .bind(dep_id)
            .fetch_optional(&mut *tx)
            .await?;
        if dep_exists.is_none() {
            return Err(StoreError::MissingDependency(dep_id.clone()));
        }
    }

    sqlx::query("INSERT INTO tasks (id, type, duration_ms, status) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(task_type)
        .bind(duration_ms)
        .bind(TaskStatus::Queued)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e.as_database_error().map(|d| d.is_unique_violation()) {
            Some(true) => StoreError::AlreadyExists(id.to_owned()),
            _ => StoreError::Sqlx(e),
        })?;

    for dep_id in deps {
        sqlx::query("INSERT INTO task_dependencies (task_id, depends_on_task_id) VALUES (?, ?)")
            .bind(id)
            .bind(dep_id)
            .execute(&mut *tx)
            .await?;
    }

    let task: Task = sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(task)
}

/// Fetch a single task by id.
pub async fn get_task(pool: &SqlitePool, id: &str) -> Result<Option<Task>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// List every task. Order is stable within a snapshot but not a contract.
pub async fn list_tasks(pool: &SqlitePool) -> Result<Vec<Task>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM tasks ORDER BY created_at ASC")
        .fetch_all(pool)
        .await
}

/// Load the full dependency adjacency list: `task id -> [dependency ids]`.
///
/// Tasks with no dependencies are omitted as keys; callers treat a missing
/// key as an empty dependency list.
pub async fn load_dependency_graph(
    pool: &SqlitePool,
) -> Result<HashMap<String, Vec<String>>, sqlx::Error> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT task_id, depends_on_task_id FROM task_dependencies")
            .fetch_all(pool)
            .await?;

    let mut graph: HashMap<String, Vec<String>> = HashMap::new();
    for (task_id, dep_id) in rows {
        graph.entry(task_id).or_default().push(dep_id);
    }
    Ok(graph)
}

/// Return up to `limit` ids of `QUEUED` tasks whose every dependency is
/// `COMPLETED`, computed as a single server-side anti-join so the view is
/// internally consistent.
pub async fn find_runnable(pool: &SqlitePool, limit: i64) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT t.id FROM tasks t \
         WHERE t.status = 'QUEUED' \
           AND NOT EXISTS ( \
               SELECT 1 FROM task_dependencies td \
               JOIN tasks dep ON dep.id = td.depends_on_task_id \
               WHERE td.task_id = t.id AND dep.status != 'COMPLETED' \
           ) \
         ORDER BY t.created_at ASC \
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Conditionally promote a task from `QUEUED` to `RUNNING`.
///
/// Returns `true` exactly when this call won the race (I6): the underlying
/// `UPDATE ... WHERE status = 'QUEUED'` only ever matches for one caller.
pub async fn claim_running(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE tasks SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
        .bind(TaskStatus::Running)
        .bind(Utc::now())
        .bind(id)
        .bind(TaskStatus::Queued)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

/// Mark a task `COMPLETED`. A missing row is logged, not treated as an error:
/// the task may have been purged externally (the core itself never does so).
pub async fn mark_completed(pool: &SqlitePool, id: &str) -> Result<(), sqlx::Error> {
    let result = sqlx::query("UPDATE tasks SET status = ?, updated_at = ? WHERE id = ?")
        .bind(TaskStatus::Completed)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        warn!(task_id = id, "task not found when marking as completed");
    }
    Ok(())
}

/// Mark a task `FAILED`. Same not-found handling as [`mark_completed`].
pub async fn mark_failed(pool: &SqlitePool, id: &str) -> Result<(), sqlx::Error> {
    let result = sqlx::query("UPDATE tasks SET status = ?, updated_at = ? WHERE id = ?")
        .bind(TaskStatus::Failed)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        warn!(task_id = id, "task not found when marking as failed");
    }
    Ok(())
}

/// Rewrite every `RUNNING` task back to `QUEUED`. Returns the number reset.
///
/// Called once at startup to restore invariant I7 after an unclean shutdown.
pub async fn reset_running_to_queued(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE tasks SET status = ?, updated_at = ? WHERE status = ?")
        .bind(TaskStatus::Queued)
        .bind(Utc::now())
        .bind(TaskStatus::Running)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
