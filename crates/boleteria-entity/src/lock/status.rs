//! Lock status enum with its Spanish wire values.

use serde::{Deserialize, Serialize};

/// Where a lock row stands in its lifecycle.
///
/// The wire values are the Spanish terms the platform has always stored;
/// checkout flows outside this subsystem perform the transitions into the
/// two terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum LockStatus {
    /// Held and sitting in a cart.
    #[serde(rename = "seleccionado")]
    #[sqlx(rename = "seleccionado")]
    Selected,
    /// Held but close to its expiry deadline; marked by the reaper.
    #[serde(rename = "expirando")]
    #[sqlx(rename = "expirando")]
    Expiring,
    /// Converted to a durable reservation. Terminal for this subsystem.
    #[serde(rename = "reservado")]
    #[sqlx(rename = "reservado")]
    Reserved,
    /// Converted to a sale. Terminal for this subsystem, never releasable.
    #[serde(rename = "pagado")]
    #[sqlx(rename = "pagado")]
    Paid,
}

impl LockStatus {
    /// Whether the release path must refuse to touch a row in this state.
    ///
    /// `reservado` and `pagado` protect sold/confirmed inventory from being
    /// clawed back by a stale client.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Reserved | Self::Paid)
    }

    /// Whether the row represents an in-cart hold subject to expiry.
    pub fn is_held(&self) -> bool {
        matches!(self, Self::Selected | Self::Expiring)
    }

    /// The stored wire value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Selected => "seleccionado",
            Self::Expiring => "expirando",
            Self::Reserved => "reservado",
            Self::Paid => "pagado",
        }
    }
}

impl std::fmt::Display for LockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
