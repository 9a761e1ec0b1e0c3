//! Cron scheduling for the expiry sweep.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use boleteria_core::config::reaper::ReaperConfig;
use boleteria_core::error::AppError;

use crate::sweep::ExpirySweep;

/// Runs the expiry sweep on a cron schedule.
pub struct ReaperScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// The sweep to run on every firing
    sweep: Arc<ExpirySweep>,
    /// Schedule and enablement
    config: ReaperConfig,
}

impl std::fmt::Debug for ReaperScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaperScheduler")
            .field("schedule", &self.config.schedule)
            .finish()
    }
}

impl ReaperScheduler {
    /// Create a new reaper scheduler
    pub async fn new(sweep: Arc<ExpirySweep>, config: ReaperConfig) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler,
            sweep,
            config,
        })
    }

    /// Register the expiry sweep on the configured schedule
    pub async fn register_sweep(&self) -> Result<(), AppError> {
        if !self.config.enabled {
            tracing::warn!("Expiry sweep disabled by configuration; abandoned locks will linger");
            return Ok(());
        }

        let sweep = Arc::clone(&self.sweep);
        let job = CronJob::new_async(self.config.schedule.as_str(), move |_uuid, _lock| {
            let sweep = Arc::clone(&sweep);
            Box::pin(async move {
                if let Err(e) = sweep.run_once().await {
                    tracing::error!("Expiry sweep failed: {}", e);
                }
            })
        })
        .map_err(|e| AppError::internal(format!("Failed to create sweep schedule: {}", e)))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add sweep schedule: {}", e)))?;

        tracing::info!(schedule = %self.config.schedule, "Registered: expiry sweep");
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {}", e)))?;

        tracing::info!("Reaper scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {}", e)))?;

        tracing::info!("Reaper scheduler shut down");
        Ok(())
    }
}
