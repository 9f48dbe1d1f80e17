//! End-to-end scenarios driving the manager, scheduler loop, and worker
//! pool together against a real (temp-file) Store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use scheduler_core::manager::{SubmitRequest, TaskManager};
use scheduler_core::recovery::run_startup_recovery;
use scheduler_core::scheduler_loop::run_scheduler_loop;
use scheduler_core::worker_pool::WorkerPool;
use scheduler_db::models::TaskStatus;
use scheduler_db::queries::tasks::{claim_running, get_task, insert_task};
use scheduler_test_utils::create_test_store;
use tokio_util::sync::CancellationToken;

fn req(id: &str, deps: &[&str], duration_ms: i64) -> SubmitRequest {
    SubmitRequest {
        id: id.to_string(),
        task_type: "sim".to_string(),
        duration_ms,
        deps: deps.iter().map(|s| s.to_string()).collect(),
    }
}

async fn wait_until_all_terminal(pool: &sqlx::SqlitePool, ids: &[&str], timeout: Duration) {
    let deadline = Instant::now() + timeout;
    loop {
        let mut all_terminal = true;
        for id in ids {
            let task = get_task(pool, id).await.unwrap().expect("task should exist");
            if !task.status.is_terminal() {
                all_terminal = false;
                break;
            }
        }
        if all_terminal {
            return;
        }
        if Instant::now() > deadline {
            panic!("timed out waiting for tasks {ids:?} to reach a terminal state");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn linear_chain_completes_in_dependency_order() {
    let (pool, _guard) = create_test_store().await;
    let manager = TaskManager::new(pool.clone());

    manager.submit(req("a", &[], 30)).await.unwrap();
    manager.submit(req("b", &["a"], 30)).await.unwrap();
    manager.submit(req("c", &["b"], 30)).await.unwrap();

    let worker_pool = Arc::new(WorkerPool::new(pool.clone(), 3));
    let cancel = CancellationToken::new();
    let loop_handle = tokio::spawn(run_scheduler_loop(
        pool.clone(),
        Arc::clone(&worker_pool),
        Duration::from_millis(10),
        cancel.clone(),
    ));

    let start = Instant::now();
    wait_until_all_terminal(&pool, &["a", "b", "c"], Duration::from_secs(5)).await;
    let elapsed = start.elapsed();

    cancel.cancel();
    let _ = loop_handle.await;

    let a = get_task(&pool, "a").await.unwrap().unwrap();
    let b = get_task(&pool, "b").await.unwrap().unwrap();
    let c = get_task(&pool, "c").await.unwrap().unwrap();

    assert_eq!(a.status, TaskStatus::Completed);
    assert_eq!(b.status, TaskStatus::Completed);
    assert_eq!(c.status, TaskStatus::Completed);

    assert!(a.updated_at <= b.updated_at, "a must complete no later than b");
    assert!(b.updated_at <= c.updated_at, "b must complete no later than c");

    assert!(
        elapsed >= Duration::from_millis(90),
        "a serial chain of three 30ms tasks should take at least 90ms, took {elapsed:?}"
    );
}

#[tokio::test]
async fn fan_out_runs_concurrently_within_capacity() {
    let (pool, _guard) = create_test_store().await;
    let manager = TaskManager::new(pool.clone());

    manager.submit(req("root", &[], 20)).await.unwrap();
    manager.submit(req("x", &["root"], 20)).await.unwrap();
    manager.submit(req("y", &["root"], 20)).await.unwrap();
    manager.submit(req("z", &["root"], 20)).await.unwrap();

    let worker_pool = Arc::new(WorkerPool::new(pool.clone(), 3));
    let cancel = CancellationToken::new();
    let loop_handle = tokio::spawn(run_scheduler_loop(
        pool.clone(),
        Arc::clone(&worker_pool),
        Duration::from_millis(10),
        cancel.clone(),
    ));

    let start = Instant::now();
    wait_until_all_terminal(&pool, &["root", "x", "y", "z"], Duration::from_secs(5)).await;
    let elapsed = start.elapsed();

    cancel.cancel();
    let _ = loop_handle.await;

    for id in ["root", "x", "y", "z"] {
        let task = get_task(&pool, id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
    }

    // root (20ms) then x/y/z concurrently (20ms) ~= 40ms, nowhere near the
    // 80ms a fully serial execution of four 20ms tasks would take.
    assert!(
        elapsed < Duration::from_millis(75),
        "fan-out siblings should run concurrently, took {elapsed:?}"
    );
}

#[tokio::test]
async fn crash_recovery_restores_consistency_before_rescheduling() {
    let (pool, _guard) = create_test_store().await;

    insert_task(&pool, "a", "t", 10, &[]).await.unwrap();
    insert_task(&pool, "b", "t", 10, &[]).await.unwrap();
    insert_task(&pool, "c", "t", 10, &[]).await.unwrap();

    claim_running(&pool, "b").await.unwrap();
    scheduler_db::queries::tasks::mark_completed(&pool, "c").await.unwrap();

    let reset = run_startup_recovery(&pool).await.unwrap();
    assert_eq!(reset, 1);

    assert_eq!(get_task(&pool, "a").await.unwrap().unwrap().status, TaskStatus::Queued);
    assert_eq!(get_task(&pool, "b").await.unwrap().unwrap().status, TaskStatus::Queued);
    assert_eq!(get_task(&pool, "c").await.unwrap().unwrap().status, TaskStatus::Completed);

    let worker_pool = Arc::new(WorkerPool::new(pool.clone(), 3));
    let cancel = CancellationToken::new();
    let loop_handle = tokio::spawn(run_scheduler_loop(
        pool.clone(),
        Arc::clone(&worker_pool),
        Duration::from_millis(10),
        cancel.clone(),
    ));

    wait_until_all_terminal(&pool, &["a", "b"], Duration::from_secs(5)).await;
    cancel.cancel();
    let _ = loop_handle.await;

    assert_eq!(get_task(&pool, "a").await.unwrap().unwrap().status, TaskStatus::Completed);
    assert_eq!(get_task(&pool, "b").await.unwrap().unwrap().status, TaskStatus::Completed);
}
