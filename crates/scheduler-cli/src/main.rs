mod config;
mod serve_cmd;
#[cfg(test)]
mod test_util;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use scheduler_core::recovery::run_startup_recovery;
use scheduler_core::scheduler_loop::run_scheduler_loop;
use scheduler_core::worker_pool::WorkerPool;
use scheduler_db::pool;

use config::AppConfig;

#[derive(Parser)]
#[command(name = "scheduler", about = "Persistent, dependency-aware task scheduler")]
struct Cli {
    /// Database URL (overrides DATABASE_URL env var)
    #[arg(long)]
    database_url: Option<String>,

    /// Address the HTTP server binds to (overrides BIND_ADDR env var)
    #[arg(long)]
    bind_addr: Option<String>,
}

/// Grace period given to in-flight task executions when shutting down.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(AppConfig::log_level())),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::resolve(cli.database_url.as_deref(), cli.bind_addr.as_deref());

    let db_pool = pool::create_pool(&config.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let reset = run_startup_recovery(&db_pool).await?;
    tracing::info!(reset_count = reset, "startup recovery complete");

    let worker_pool = Arc::new(WorkerPool::new(db_pool.clone(), config.max_concurrent_tasks));
    let cancel = CancellationToken::new();

    let loop_handle = tokio::spawn(run_scheduler_loop(
        db_pool.clone(),
        Arc::clone(&worker_pool),
        Duration::from_millis(config.poll_interval_ms),
        cancel.clone(),
    ));

    let shutdown_cancel = cancel.clone();
    let shutdown = async move {
        shutdown_signal().await;
        tracing::info!("shutdown signal received");
        shutdown_cancel.cancel();
    };

    let serve_result = serve_cmd::run_serve(db_pool.clone(), &config.bind_addr, shutdown).await;

    cancel.cancel();
    let _ = loop_handle.await;
    worker_pool.shutdown(DRAIN_TIMEOUT).await;
    db_pool.close().await;

    serve_result?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
}
