//! DashHub Scheduler: background jobs and deferred queue processing
//!
//! Main entry point that wires the adapters together and runs the scheduler.

use std::sync::Arc;

use tokio::sync::watch;
use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use dashhub_cache::CacheManager;
use dashhub_core::config::AppConfig;
use dashhub_core::error::AppError;
use dashhub_core::traits::cache::CacheProvider;
use dashhub_realtime::PubSubManager;
use dashhub_worker::SchedulerRuntime;

#[tokio::main]
async fn main() {
    let env = std::env::var("DASHHUB_ENV").unwrap_or_else(|_| "development".to_string());

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
        tracing::error!(error = %e, "Scheduler error");
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

/// Main scheduler run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting DashHub scheduler v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Queue store (migrations are the readiness gate) ──
    tracing::info!(provider = %config.database.provider, "Connecting queue store...");
    let store = dashhub_database::connect_queue_store(&config.database).await?;

    // ── Step 2: Cache for job status ─────────────────────────────
    tracing::info!(provider = %config.cache.provider, "Initializing cache...");
    let cache = Arc::new(CacheManager::new(&config.cache).await?);
    if !cache.health_check().await? {
        return Err(AppError::service_unavailable(format!(
            "Cache provider '{}' failed its health check",
            config.cache.provider
        )));
    }

    // ── Step 3: Pub/sub for triggers and status events ───────────
    tracing::info!(provider = %config.pubsub.provider, "Initializing pub/sub...");
    let pubsub = Arc::new(PubSubManager::new(&config.pubsub).await?);

    // ── Step 4: Scheduler runtime ────────────────────────────────
    let runtime = SchedulerRuntime::builder(config.worker.clone(), store, cache, pubsub)
        .build()
        .await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let listener = runtime.listen_for_triggers(shutdown_rx).await?;

    if config.worker.enabled {
        runtime.start_all().await?;
    } else {
        tracing::warn!("Scheduler disabled by configuration; only manual triggers will run");
    }

    // ── Step 5: Wait for shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
    let _ = shutdown_tx.send(true);

    runtime.shutdown().await?;
    if let Err(e) = listener.await {
        tracing::warn!(error = %e, "Trigger listener ended abnormally");
    }

    tracing::info!("DashHub scheduler stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
