//! URA Box Backend Service
//!
//! Standalone entry point: wires the in-memory document store, the engine
//! services, and the background result poller that settles events once
//! their result time passes.

use std::sync::Arc;
use tracing::{error, info, warn};
use urabox_backend::clock::SystemClock;
use urabox_backend::config::AppConfig;
use urabox_backend::error::{AppError, AppResult};
use urabox_backend::services::ResultPoller;
use urabox_backend::store::MemoryStore;
use urabox_backend::AppState;

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        AppError::Config(e)
    })?;

    // Initialize tracing/logging with config
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("urabox_backend={}", config.log_level).into()),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║            URA Box Backend Service Starting               ║");
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);

    // =========================================================================
    // STORE SETUP
    // =========================================================================
    let store = Arc::new(MemoryStore::with_max_tx_attempts(
        config.store.max_transaction_attempts,
    ));
    info!(
        "Document store initialized (in-memory, {} transaction attempts)",
        config.store.max_transaction_attempts
    );

    // =========================================================================
    // CORE SERVICES INITIALIZATION
    // =========================================================================
    let clock = Arc::new(SystemClock);
    let app_state = Arc::new(AppState::new(store, clock.clone()));
    info!("✓ Application state initialized with repositories and engines");

    // =========================================================================
    // BACKGROUND TASKS
    // =========================================================================
    let poller_handle = if let Some(interval) = config.result_poll_interval() {
        let poller = ResultPoller::new(
            app_state.event_repo.clone(),
            app_state.winner_service.clone(),
            clock,
            interval,
        );
        let handle = tokio::spawn(async move {
            poller.start().await;
        });
        info!("✓ Result poller started ({:?} interval)", interval);
        Some(handle)
    } else {
        warn!("RESULT_POLL_INTERVAL_SECS=0 - result poller not started");
        None
    };

    // =========================================================================
    // READY
    // =========================================================================
    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║            URA Box Backend Service Ready!                 ║");
    info!("╚══════════════════════════════════════════════════════════╝");
    info!(
        "Result sweep: {}",
        config
            .result_poll_interval()
            .map(|d| format!("every {:?}", d))
            .unwrap_or_else(|| "disabled".to_string())
    );
    info!("Press Ctrl+C to shutdown gracefully");

    // =========================================================================
    // SHUTDOWN HANDLING
    // =========================================================================
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, shutting down gracefully...");
        }
        _ = async {
            if let Some(handle) = poller_handle {
                handle.await.ok();
            } else {
                // Never completes if the poller is not running
                futures::future::pending::<()>().await;
            }
        } => {
            error!("Result poller exited unexpectedly");
        }
    }

    info!("URA Box backend service shutdown complete");
    Ok(())
}
