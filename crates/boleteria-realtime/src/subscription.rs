//! Live subscription handle tying feed, seed fetch, and dispatcher
//! together for one function.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use boleteria_core::result::AppResult;
use boleteria_core::retry::RetryPolicy;
use boleteria_core::traits::Clock;
use boleteria_core::types::{FunctionId, SessionId};
use boleteria_database::lock_table::LockTable;

use crate::dispatcher::FeedDispatcher;
use crate::mirror::LockMirror;

/// A running change-feed subscription for one function.
///
/// Owns the dispatcher task. Dropping the handle cancels the task;
/// [`shutdown`](Self::shutdown) additionally waits for it to wind down.
#[derive(Debug)]
pub struct FunctionSubscription {
    function_id: FunctionId,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl FunctionSubscription {
    /// Open the feed, seed the mirror, and start the dispatcher.
    ///
    /// The feed receiver is created before the seed fetch: a change
    /// landing between the fetch and the first recv is buffered and
    /// replayed on top of the seed, which is safe because application is
    /// last-write-wins per resource. Errors from the watch or the seed
    /// fetch propagate; nothing is spawned in that case.
    pub async fn open(
        table: Arc<dyn LockTable>,
        mirror: Arc<LockMirror>,
        clock: Arc<dyn Clock>,
        retry: RetryPolicy,
        session_id: SessionId,
        function_id: FunctionId,
    ) -> AppResult<Self> {
        let feed = table.watch(function_id).await?;

        let dispatcher =
            FeedDispatcher::new(table, mirror, clock, retry, session_id, function_id);
        let seeded = dispatcher.reseed().await?;

        let cancel = CancellationToken::new();
        let task = tokio::spawn(dispatcher.run(feed, cancel.clone()));

        info!(
            function_id = %function_id,
            seeded_rows = seeded,
            "Subscribed to lock feed"
        );
        Ok(Self {
            function_id,
            cancel,
            task,
        })
    }

    /// The function this subscription watches.
    pub fn function_id(&self) -> FunctionId {
        self.function_id
    }

    /// Whether the dispatcher task is still consuming the feed.
    ///
    /// A dead dispatcher (closed feed, panic) makes a re-subscribe to the
    /// same function start over instead of no-opping.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancel the dispatcher and wait for it to stop.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        let _ = (&mut self.task).await;
        debug!(function_id = %self.function_id, "Lock feed subscription shut down");
    }
}

impl Drop for FunctionSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
