//! The two-phase expiry sweep.

use std::sync::Arc;

use tracing::{debug, info};

use boleteria_core::config::locks::LocksConfig;
use boleteria_core::result::AppResult;
use boleteria_core::traits::clock::Clock;
use boleteria_database::LockTable;

/// What one sweep pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// `seleccionado` rows flagged `expirando` because their hold deadline
    /// is inside the warning window.
    pub marked: u64,
    /// Non-terminal rows deleted because their hold deadline passed.
    pub reaped: u64,
}

/// Scans the lock table for holds that clients walked away from.
///
/// Clients that crash or lose power never release their locks; this sweep
/// is what eventually frees those seats. Terminal rows are never touched.
#[derive(Debug)]
pub struct ExpirySweep {
    table: Arc<dyn LockTable>,
    clock: Arc<dyn Clock>,
    threshold: chrono::Duration,
}

impl ExpirySweep {
    pub fn new(table: Arc<dyn LockTable>, clock: Arc<dyn Clock>, config: &LocksConfig) -> Self {
        Self {
            table,
            clock,
            threshold: config.expiring_threshold(),
        }
    }

    /// One full pass: flag the soon-to-expire, then reap the expired.
    ///
    /// Both phases notify the change feed row by row, so subscribed
    /// mirrors see `expirando` flips and deletions as they happen.
    pub async fn run_once(&self) -> AppResult<SweepReport> {
        let now = self.clock.now();

        // ── Step 1: flag holds inside the warning window ──
        let marked = self.table.mark_expiring(now, self.threshold).await?;

        // ── Step 2: drop holds past their deadline ──
        let reaped = self.table.delete_expired(now).await?;

        if marked > 0 || reaped > 0 {
            info!(marked, reaped, "Expiry sweep finished");
        } else {
            debug!("Expiry sweep found nothing to do");
        }
        Ok(SweepReport { marked, reaped })
    }
}
