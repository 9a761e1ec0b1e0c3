//! Change-feed dispatcher that keeps a [`LockMirror`] current.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use boleteria_core::result::AppResult;
use boleteria_core::retry::RetryPolicy;
use boleteria_core::traits::Clock;
use boleteria_core::types::{FunctionId, SessionId};
use boleteria_database::lock_table::LockTable;
use boleteria_entity::lock::LockChange;

use crate::mirror::LockMirror;

/// Applies one function's change feed to its mirror.
///
/// The loop runs until cancelled or the feed closes. A lagged receiver
/// means changes were dropped on the floor; rather than guess at what was
/// missed, the dispatcher refetches the live rows and reseeds the whole
/// mirror. Buffered changes replayed after a reseed are harmless because
/// application is last-write-wins per resource.
#[derive(Debug)]
pub struct FeedDispatcher {
    table: Arc<dyn LockTable>,
    mirror: Arc<LockMirror>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    session_id: SessionId,
    function_id: FunctionId,
}

impl FeedDispatcher {
    /// Create a dispatcher for one function's feed.
    pub fn new(
        table: Arc<dyn LockTable>,
        mirror: Arc<LockMirror>,
        clock: Arc<dyn Clock>,
        retry: RetryPolicy,
        session_id: SessionId,
        function_id: FunctionId,
    ) -> Self {
        Self {
            table,
            mirror,
            clock,
            retry,
            session_id,
            function_id,
        }
    }

    /// Consume the feed until the token cancels or the sender goes away.
    pub async fn run(self, mut feed: broadcast::Receiver<LockChange>, cancel: CancellationToken) {
        debug!(function_id = %self.function_id, "Lock feed dispatcher started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(function_id = %self.function_id, "Lock feed dispatcher cancelled");
                    break;
                }
                next = feed.recv() => match next {
                    Ok(change) => {
                        debug!(
                            function_id = %self.function_id,
                            op = change.op_name(),
                            "Applying lock change"
                        );
                        self.mirror.apply(&change, &self.session_id);
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(
                            function_id = %self.function_id,
                            missed,
                            "Lock feed lagged, reseeding mirror from the table"
                        );
                        if let Err(err) = self.reseed().await {
                            error!(
                                function_id = %self.function_id,
                                error = %err,
                                "Mirror reseed after lag failed"
                            );
                        }
                    }
                    Err(RecvError::Closed) => {
                        warn!(
                            function_id = %self.function_id,
                            "Lock feed closed, dispatcher exiting"
                        );
                        break;
                    }
                }
            }
        }
    }

    /// One authoritative fetch-and-replace of the mirror contents.
    ///
    /// Also used for the initial seed right after the feed opens.
    pub async fn reseed(&self) -> AppResult<usize> {
        let rows = self
            .retry
            .run("mirror_reseed", || {
                self.table.list_live(self.function_id, self.clock.now())
            })
            .await?;
        let count = rows.len();
        self.mirror.seed(rows);
        debug!(function_id = %self.function_id, rows = count, "Mirror reseeded");
        Ok(count)
    }
}
