//! PostgreSQL lock table: conditional upsert plus LISTEN/NOTIFY feed.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use boleteria_core::error::{AppError, ErrorKind};
use boleteria_core::result::AppResult;
use boleteria_core::types::{FunctionId, ResourceKey, SessionId};
use boleteria_entity::lock::{LockChange, LockClaim, SeatLock};

use crate::lock_table::{LockTable, ReleaseOutcome, UpsertOutcome};

/// Feed buffer per function. A consumer lagging past this point must
/// refetch from the table.
const FEED_CAPACITY: usize = 256;

/// Conditional write for a seat claim. The update branch only fires when
/// the standing row is non-terminal and either ours or expired; the CASE
/// keeps the original `locked_at` on a same-session extend and resets it
/// on a takeover.
const UPSERT_SEAT: &str = "INSERT INTO seat_locks \
     (seat_id, table_id, funcion_id, session_id, lock_type, status, locked_at, expires_at) \
     VALUES ($1, NULL, $2, $3, 'seat', $4, $5, $6) \
     ON CONFLICT (funcion_id, seat_id) WHERE seat_id IS NOT NULL \
     DO UPDATE SET \
         session_id = EXCLUDED.session_id, \
         status = EXCLUDED.status, \
         locked_at = CASE WHEN seat_locks.session_id = EXCLUDED.session_id \
                          THEN seat_locks.locked_at ELSE EXCLUDED.locked_at END, \
         expires_at = EXCLUDED.expires_at \
     WHERE seat_locks.status NOT IN ('reservado', 'pagado') \
       AND (seat_locks.session_id = EXCLUDED.session_id \
            OR seat_locks.expires_at <= EXCLUDED.locked_at) \
     RETURNING *";

/// Same conditional write for a whole-table claim.
const UPSERT_TABLE: &str = "INSERT INTO seat_locks \
     (seat_id, table_id, funcion_id, session_id, lock_type, status, locked_at, expires_at) \
     VALUES (NULL, $1, $2, $3, 'table', $4, $5, $6) \
     ON CONFLICT (funcion_id, table_id) WHERE table_id IS NOT NULL \
     DO UPDATE SET \
         session_id = EXCLUDED.session_id, \
         status = EXCLUDED.status, \
         locked_at = CASE WHEN seat_locks.session_id = EXCLUDED.session_id \
                          THEN seat_locks.locked_at ELSE EXCLUDED.locked_at END, \
         expires_at = EXCLUDED.expires_at \
     WHERE seat_locks.status NOT IN ('reservado', 'pagado') \
       AND (seat_locks.session_id = EXCLUDED.session_id \
            OR seat_locks.expires_at <= EXCLUDED.locked_at) \
     RETURNING *";

const DELETE_SEAT: &str = "DELETE FROM seat_locks \
     WHERE funcion_id = $1 AND seat_id = $2 AND session_id = $3 \
       AND status NOT IN ('reservado', 'pagado') \
     RETURNING *";

const DELETE_TABLE: &str = "DELETE FROM seat_locks \
     WHERE funcion_id = $1 AND table_id = $2 AND session_id = $3 \
       AND status NOT IN ('reservado', 'pagado') \
     RETURNING *";

const FIND_SEAT: &str = "SELECT * FROM seat_locks WHERE funcion_id = $1 AND seat_id = $2";
const FIND_TABLE: &str = "SELECT * FROM seat_locks WHERE funcion_id = $1 AND table_id = $2";

/// PostgreSQL-backed lock table.
///
/// The upsert is a single conditional statement, so competing claims on
/// the same `(function, resource)` pair serialize inside the database.
/// The change feed rides the `seat_locks_<funcion_id>` NOTIFY channels
/// emitted by the row trigger; one listener task per watched function
/// fans out to a broadcast channel.
#[derive(Debug, Clone)]
pub struct PgLockTable {
    pool: PgPool,
    /// Feed senders keyed by function, shared with the listener tasks.
    feeds: Arc<DashMap<FunctionId, broadcast::Sender<LockChange>>>,
}

impl PgLockTable {
    /// Create a lock table over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            feeds: Arc::new(DashMap::new()),
        }
    }

    async fn fetch_row(
        &self,
        resource: &ResourceKey,
        function_id: FunctionId,
    ) -> AppResult<Option<SeatLock>> {
        let sql = match resource {
            ResourceKey::Seat(_) => FIND_SEAT,
            ResourceKey::Table(_) => FIND_TABLE,
        };
        sqlx::query_as::<_, SeatLock>(sql)
            .bind(function_id)
            .bind(resource.raw_id())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to fetch lock row", e))
    }
}

#[async_trait]
impl LockTable for PgLockTable {
    async fn upsert(&self, claim: &LockClaim) -> AppResult<UpsertOutcome> {
        let sql = match claim.resource {
            ResourceKey::Seat(_) => UPSERT_SEAT,
            ResourceKey::Table(_) => UPSERT_TABLE,
        };

        let written: Option<SeatLock> = sqlx::query_as(sql)
            .bind(claim.resource.raw_id())
            .bind(claim.function_id)
            .bind(claim.session_id.as_str())
            .bind(claim.status)
            .bind(claim.locked_at)
            .bind(claim.expires_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to upsert lock", e))?;

        match written {
            Some(row) => {
                // TIMESTAMPTZ keeps microseconds while the claim stamp may
                // carry nanoseconds, so "kept our locked_at" is a closeness
                // test: a fresh insert or takeover echoes the claim stamp,
                // an extend keeps the (older) original.
                let created = (row.locked_at - claim.locked_at).abs() < Duration::milliseconds(1);
                if created {
                    Ok(UpsertOutcome::Created(row))
                } else {
                    Ok(UpsertOutcome::Extended(row))
                }
            }
            None => {
                // The conditional update declined; report the standing
                // holder when a racing delete has not removed it yet.
                let holder = match self.fetch_row(&claim.resource, claim.function_id).await {
                    Ok(row) => row.map(|r| r.session_id),
                    Err(e) => {
                        debug!(error = %e, "Holder lookup after conflict failed");
                        None
                    }
                };
                Ok(UpsertOutcome::Conflict { holder })
            }
        }
    }

    async fn delete(
        &self,
        resource: &ResourceKey,
        function_id: FunctionId,
        session_id: &SessionId,
    ) -> AppResult<ReleaseOutcome> {
        let sql = match resource {
            ResourceKey::Seat(_) => DELETE_SEAT,
            ResourceKey::Table(_) => DELETE_TABLE,
        };

        let removed: Option<SeatLock> = sqlx::query_as(sql)
            .bind(function_id)
            .bind(resource.raw_id())
            .bind(session_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete lock", e))?;

        if let Some(row) = removed {
            return Ok(ReleaseOutcome::Released(row));
        }

        // Nothing matched: distinguish a terminal row from plain absence.
        match self.fetch_row(resource, function_id).await? {
            Some(row) if row.is_terminal() => Ok(ReleaseOutcome::Refused { status: row.status }),
            _ => Ok(ReleaseOutcome::NotHeld),
        }
    }

    async fn delete_all_for_session(
        &self,
        function_id: FunctionId,
        session_id: &SessionId,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM seat_locks \
             WHERE funcion_id = $1 AND session_id = $2 \
               AND status NOT IN ('reservado', 'pagado')",
        )
        .bind(function_id)
        .bind(session_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to delete session locks", e)
        })?;

        Ok(result.rows_affected())
    }

    async fn find(
        &self,
        resource: &ResourceKey,
        function_id: FunctionId,
    ) -> AppResult<Option<SeatLock>> {
        self.fetch_row(resource, function_id).await
    }

    async fn list_live(
        &self,
        function_id: FunctionId,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<SeatLock>> {
        sqlx::query_as::<_, SeatLock>(
            "SELECT * FROM seat_locks \
             WHERE funcion_id = $1 \
               AND (expires_at > $2 OR status IN ('reservado', 'pagado')) \
             ORDER BY locked_at",
        )
        .bind(function_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list live locks", e))
    }

    async fn mark_expiring(&self, now: DateTime<Utc>, threshold: Duration) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE seat_locks SET status = 'expirando' \
             WHERE status = 'seleccionado' AND expires_at > $1 AND expires_at <= $2",
        )
        .bind(now)
        .bind(now + threshold)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark expiring locks", e)
        })?;

        Ok(result.rows_affected())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM seat_locks \
             WHERE expires_at <= $1 AND status NOT IN ('reservado', 'pagado')",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to delete expired locks", e)
        })?;

        Ok(result.rows_affected())
    }

    async fn watch(&self, function_id: FunctionId) -> AppResult<broadcast::Receiver<LockChange>> {
        if let Some(feed) = self.feeds.get(&function_id) {
            return Ok(feed.subscribe());
        }

        let channel = format!("seat_locks_{}", function_id.as_i64());
        let mut listener = PgListener::connect_with(&self.pool).await.map_err(|e| {
            AppError::with_source(ErrorKind::Transport, "Failed to open change listener", e)
        })?;
        listener.listen(&channel).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Transport,
                format!("Failed to listen on {channel}"),
                e,
            )
        })?;

        let (sender, receiver) = broadcast::channel(FEED_CAPACITY);
        match self.feeds.entry(function_id) {
            // Lost a watch race; the fresh listener drops with this scope.
            Entry::Occupied(existing) => return Ok(existing.get().subscribe()),
            Entry::Vacant(slot) => {
                slot.insert(sender.clone());
            }
        }

        let feeds = Arc::clone(&self.feeds);
        tokio::spawn(async move {
            loop {
                match listener.recv().await {
                    Ok(notification) => {
                        match serde_json::from_str::<LockChange>(notification.payload()) {
                            Ok(change) => {
                                let _ = sender.send(change);
                            }
                            Err(e) => {
                                warn!(error = %e, channel = %channel, "Dropping malformed lock change payload");
                            }
                        }
                    }
                    Err(e) => {
                        // Dropping the last sender closes every receiver;
                        // subscribers re-watch to reconnect.
                        warn!(error = %e, channel = %channel, "Lock change listener lost its connection");
                        feeds.remove(&function_id);
                        break;
                    }
                }
            }
        });

        Ok(receiver)
    }
}
