//! SubTrack server: notification and payment-obligation engine.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use subtrack_api::{AppState, build_app};
use subtrack_core::config::{AppConfig, StorageProvider};
use subtrack_core::error::AppError;
use subtrack_database::{DatabasePool, Storage};
use subtrack_worker::{CronScheduler, JobQueue, JobQueueScheduler, WorkerRunner, default_executor};

#[tokio::main]
async fn main() {
    let env = std::env::var("SUBTRACK_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Open the configured storage backend, running migrations for PostgreSQL.
async fn open_storage(config: &AppConfig) -> Result<(Storage, Option<DatabasePool>), AppError> {
    match config.database.provider {
        StorageProvider::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");
            Ok((Storage::in_memory(), None))
        }
        StorageProvider::Postgres => {
            let db = DatabasePool::connect(&config.database).await?;
            if config.database.run_migrations {
                tracing::info!("Running database migrations...");
                subtrack_database::migration::run_migrations(db.pool()).await?;
                tracing::info!("Database migrations complete");
            }
            Ok((Storage::postgres(db.pool().clone()), Some(db)))
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting SubTrack v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Storage ──────────────────────────────────────────
    let (storage, db) = open_storage(&config).await?;

    // ── Step 2: Job queue and reminder scheduler ─────────────────
    let worker_id = format!("worker-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
    let job_queue = Arc::new(JobQueue::new(Arc::clone(&storage.jobs), worker_id));
    let scheduler = Arc::new(JobQueueScheduler::new(Arc::clone(&job_queue)));

    // ── Step 3: Services ─────────────────────────────────────────
    let state = AppState::new(config.clone(), storage, scheduler);

    // ── Step 4: Worker and cron tasks ────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut cron = None;
    let worker_handle = if config.worker.enabled {
        let executor = Arc::new(default_executor(
            Arc::clone(&state.reminder_coordinator),
            Arc::clone(&state.payment_tracker),
            Arc::clone(&state.generator),
            Arc::clone(&job_queue),
            config.worker.job_retention_days,
        ));
        tracing::info!(job_types = ?executor.registered_types(), "Job handlers registered");

        let scheduler = CronScheduler::new(Arc::clone(&job_queue)).await?;
        scheduler.register_default_tasks(&config.worker).await?;
        scheduler.start().await?;
        cron = Some(scheduler);

        let runner = WorkerRunner::new(Arc::clone(&job_queue), executor, config.worker.clone());
        let worker_cancel = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            runner.run(worker_cancel).await;
        }))
    } else {
        tracing::info!("Background worker disabled");
        None
    };

    // ── Step 5: HTTP server ──────────────────────────────────────
    let app = build_app(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
    tracing::info!(addr = %addr, "SubTrack server listening");

    // ── Step 6: Graceful shutdown ────────────────────────────────
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown...");
            let _ = shutdown_tx.send(true);
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    if let Some(mut scheduler) = cron {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!(error = %e, "Cron scheduler did not shut down cleanly");
        }
    }

    if let Some(handle) = worker_handle {
        let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
        if tokio::time::timeout(grace, handle).await.is_err() {
            tracing::warn!("Worker did not stop within the grace period");
        }
    }

    if let Some(db) = db {
        db.close().await;
    }

    tracing::info!("SubTrack server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
