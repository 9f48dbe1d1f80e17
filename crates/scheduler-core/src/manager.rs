//! Task manager: the submission write path.
//!
//! Validates a proposed task against the preconditions in order (first
//! failure wins), then persists it through the Store.

use sqlx::SqlitePool;

use scheduler_db::models::Task;
use scheduler_db::queries::tasks as task_db;

use crate::dag::has_cycle;
use crate::error::SchedulerError;

/// A task submission as received from a client.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub id: String,
    pub task_type: String,
    pub duration_ms: i64,
    pub deps: Vec<String>,
}

/// Owns the write path for new tasks. Holds no state beyond the pool: all
/// decisions are made against a fresh read of the Store.
#[derive(Clone)]
pub struct TaskManager {
    pool: SqlitePool,
}

impl TaskManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Validate and persist a new task.
    ///
    /// Preconditions are checked in the order named in the submission path:
    /// malformed input, id collision, missing dependencies, then acyclicity
    /// of the dependency graph extended with the proposed edges.
    pub async fn submit(&self, req: SubmitRequest) -> Result<Task, SchedulerError> {
        if req.id.trim().is_empty() {
            return Err(SchedulerError::ValidationError("id must not be empty".into()));
        }
        if req.task_type.trim().is_empty() {
            return Err(SchedulerError::ValidationError("type must not be empty".into()));
        }
        if req.duration_ms <= 0 {
            return Err(SchedulerError::ValidationError(
                "duration_ms must be positive".into(),
            ));
        }

        if task_db::get_task(&self.pool, &req.id).await?.is_some() {
            return Err(SchedulerError::AlreadyExists(req.id));
        }

        for dep in &req.deps {
            if task_db::get_task(&self.pool, dep).await?.is_none() {
                return Err(SchedulerError::MissingDependency(dep.clone()));
            }
        }

        let mut graph = task_db::load_dependency_graph(&self.pool).await?;
        graph.insert(req.id.clone(), req.deps.clone());
        if has_cycle(&graph) {
            return Err(SchedulerError::CycleDetected);
        }

        let task =
            task_db::insert_task(&self.pool, &req.id, &req.task_type, req.duration_ms, &req.deps)
                .await?;

        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scheduler_db::models::TaskStatus;
    use scheduler_test_utils::create_test_store;

    fn req(id: &str, deps: &[&str]) -> SubmitRequest {
        SubmitRequest {
            id: id.to_string(),
            task_type: "data_processing".to_string(),
            duration_ms: 100,
            deps: deps.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn submit_creates_queued_task() {
        let (pool, _guard) = create_test_store().await;
        let manager = TaskManager::new(pool);

        let task = manager.submit(req("a", &[])).await.unwrap();
        assert_eq!(task.id, "a");
        assert_eq!(task.status, TaskStatus::Queued);
    }

    #[tokio::test]
    async fn submit_rejects_empty_id() {
        let (pool, _guard) = create_test_store().await;
        let manager = TaskManager::new(pool);

        let err = manager.submit(req("", &[])).await.unwrap_err();
        assert!(matches!(err, SchedulerError::ValidationError(_)));
    }

    #[tokio::test]
    async fn submit_rejects_nonpositive_duration() {
        let (pool, _guard) = create_test_store().await;
        let manager = TaskManager::new(pool);

        let mut request = req("a", &[]);
        request.duration_ms = 0;
        let err = manager.submit(request).await.unwrap_err();
        assert!(matches!(err, SchedulerError::ValidationError(_)));
    }

    #[tokio::test]
    async fn submit_rejects_duplicate_id() {
        let (pool, _guard) = create_test_store().await;
        let manager = TaskManager::new(pool);

        manager.submit(req("a", &[])).await.unwrap();
        let err = manager.submit(req("a", &[])).await.unwrap_err();
        assert!(matches!(err, SchedulerError::AlreadyExists(id) if id == "a"));
    }

    #[tokio::test]
    async fn submit_rejects_missing_dependency() {
        let (pool, _guard) = create_test_store().await;
        let manager = TaskManager::new(pool);

        let err = manager.submit(req("a", &["ghost"])).await.unwrap_err();
        assert!(matches!(err, SchedulerError::MissingDependency(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn submit_accepts_valid_dependency_chain() {
        let (pool, _guard) = create_test_store().await;
        let manager = TaskManager::new(pool);

        manager.submit(req("a", &[])).await.unwrap();
        let task = manager.submit(req("b", &["a"])).await.unwrap();
        assert_eq!(task.id, "b");
    }
}
