//! Boletería lock reaper.
//!
//! Standalone binary that sweeps the shared seat-lock table on a cron
//! schedule: flags locks entering their final minute as `expirando`
//! and deletes non-terminal locks whose hold lapsed, so seats held by
//! vanished sessions return to the pool.

use std::sync::Arc;

use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use boleteria_core::config::AppConfig;
use boleteria_core::error::AppError;
use boleteria_core::traits::clock::{Clock, SystemClock};
use boleteria_database::LockTable;
use boleteria_database::connection::DatabasePool;
use boleteria_database::postgres::PgLockTable;
use boleteria_worker::{ExpirySweep, ReaperScheduler};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Reaper error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("BOLETERIA_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
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

/// Main reaper run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting boleteria reaper v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    if config.database.url.is_empty() {
        return Err(AppError::configuration(
            "database.url is required; the reaper sweeps the shared lock table",
        ));
    }

    let db = DatabasePool::connect(&config.database).await?;

    if config.database.auto_migrate {
        boleteria_database::migration::run_migrations(db.pool()).await?;
    }

    // ── Step 2: Build the expiry sweep ───────────────────────────
    let table = Arc::new(PgLockTable::new(db.pool().clone())) as Arc<dyn LockTable>;
    let clock = Arc::new(SystemClock) as Arc<dyn Clock>;
    let sweep = Arc::new(ExpirySweep::new(table, clock, &config.locks));

    // ── Step 3: Catch-up sweep ───────────────────────────────────
    let report = sweep.run_once().await?;
    tracing::info!(
        marked = report.marked,
        reaped = report.reaped,
        "Catch-up sweep complete"
    );

    // ── Step 4: Start the scheduler ──────────────────────────────
    let mut scheduler = ReaperScheduler::new(Arc::clone(&sweep), config.reaper.clone()).await?;
    scheduler.register_sweep().await?;
    scheduler.start().await?;

    tracing::info!("Reaper running");

    // ── Step 5: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping scheduler...");

    scheduler.shutdown().await?;
    db.close().await;

    tracing::info!("Reaper shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
