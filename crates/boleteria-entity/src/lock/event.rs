//! Typed change-notification events for the lock table.

use serde::{Deserialize, Serialize};

use boleteria_core::types::FunctionId;

use crate::lock::model::SeatLock;

/// One incremental change to the lock table, carrying the affected row.
///
/// Every mutation of the shared table is broadcast to subscribed clients
/// as one of these; a single dispatcher loop per subscription applies them
/// to the local mirror. For `Deleted` the payload is the row as it stood
/// before deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "row", rename_all = "snake_case")]
pub enum LockChange {
    /// A new lock row appeared.
    Inserted(SeatLock),
    /// An existing row changed (extend, status transition).
    Updated(SeatLock),
    /// A row was removed (release or reap).
    Deleted(SeatLock),
}

impl LockChange {
    /// The row this change carries.
    pub fn row(&self) -> &SeatLock {
        match self {
            Self::Inserted(row) | Self::Updated(row) | Self::Deleted(row) => row,
        }
    }

    /// The function the changed row is scoped to.
    pub fn function_id(&self) -> FunctionId {
        self.row().function_id
    }

    /// Short operation name for log lines.
    pub fn op_name(&self) -> &'static str {
        match self {
            Self::Inserted(_) => "inserted",
            Self::Updated(_) => "updated",
            Self::Deleted(_) => "deleted",
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use boleteria_core::types::{LockKind, ResourceKey, SessionId};

    use super::*;
    use crate::lock::model::LockClaim;
    use crate::lock::status::LockStatus;

    fn make_row() -> SeatLock {
        let now = Utc::now();
        LockClaim {
            resource: ResourceKey::seat("A1"),
            function_id: FunctionId::new(7),
            session_id: SessionId::new("sess-a"),
            status: LockStatus::Selected,
            locked_at: now,
            expires_at: now + Duration::minutes(10),
        }
        .into_row()
    }

    #[test]
    fn test_tagged_wire_shape() {
        let change = LockChange::Inserted(make_row());
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["op"], "inserted");
        assert_eq!(json["row"]["funcion_id"], 7);

        let parsed: LockChange = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.function_id(), FunctionId::new(7));
        assert_eq!(parsed.row().lock_type, LockKind::Seat);
    }

    #[test]
    fn test_deleted_carries_prior_row() {
        let change = LockChange::Deleted(make_row());
        assert_eq!(change.op_name(), "deleted");
        assert_eq!(change.row().seat_id.as_ref().unwrap().as_str(), "A1");
    }
}
