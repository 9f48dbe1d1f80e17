//! HTTP surface: health checks and the task submission/read API.

use std::net::SocketAddr;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;

use scheduler_core::error::SchedulerError;
use scheduler_core::manager::{SubmitRequest, TaskManager};
use scheduler_db::models::Task;
use scheduler_db::queries::tasks as task_db;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{err:#}"),
        }
    }
}

impl From<SchedulerError> for AppError {
    fn from(err: SchedulerError) -> Self {
        let status = match &err {
            SchedulerError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SchedulerError::AlreadyExists(_) => StatusCode::CONFLICT,
            SchedulerError::MissingDependency(_) => StatusCode::BAD_REQUEST,
            SchedulerError::CycleDetected => StatusCode::BAD_REQUEST,
            SchedulerError::NotFound(_) => StatusCode::NOT_FOUND,
            SchedulerError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SchedulerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "detail": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SubmitTaskBody {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub duration_ms: i64,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub duration_ms: i64,
    pub status: String,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            task_type: task.task_type,
            duration_ms: task.duration_ms,
            status: task.status.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskResponse>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(pool: SqlitePool) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/db-health", get(db_health))
        .route("/tasks", post(submit_task).get(list_tasks))
        .route("/tasks/{id}", get(get_task_handler))
        .layer(CorsLayer::permissive())
        .with_state(pool)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(
    pool: SqlitePool,
    bind_addr: &str,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = build_router(pool);
    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid bind address {bind_addr:?}: {e}"))?;
    tracing::info!(%addr, "HTTP server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("HTTP server shut down");
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn db_health(State(pool): State<SqlitePool>) -> impl IntoResponse {
    match scheduler_db::pool::health_check(&pool).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "db": "ok" }))).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "db-health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "detail": "Database connection failed" })),
            )
                .into_response()
        }
    }
}

async fn submit_task(
    State(pool): State<SqlitePool>,
    Json(body): Json<SubmitTaskBody>,
) -> Result<axum::response::Response, AppError> {
    let manager = TaskManager::new(pool);
    let task = manager
        .submit(SubmitRequest {
            id: body.id,
            task_type: body.task_type,
            duration_ms: body.duration_ms,
            deps: body.dependencies,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(TaskResponse::from(task))).into_response())
}

async fn get_task_handler(
    State(pool): State<SqlitePool>,
    Path(id): Path<String>,
) -> Result<axum::response::Response, AppError> {
    let task = task_db::get_task(&pool, &id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("task {id:?} not found")))?;

    Ok(Json(TaskResponse::from(task)).into_response())
}

async fn list_tasks(State(pool): State<SqlitePool>) -> Result<axum::response::Response, AppError> {
    let tasks = task_db::list_tasks(&pool).await.map_err(AppError::internal)?;
    let tasks = tasks.into_iter().map(TaskResponse::from).collect();

    Ok(Json(TaskListResponse { tasks }).into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
