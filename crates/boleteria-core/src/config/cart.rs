//! Cart reservation configuration.

use serde::{Deserialize, Serialize};

/// Bounds accepted for the cart deadline, in minutes.
const MIN_EXPIRATION_MINUTES: u64 = 1;
const MAX_EXPIRATION_MINUTES: u64 = 120;

/// Cart deadline and persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartConfig {
    /// Lifetime of the whole cart from its first item, in minutes.
    /// Values outside 1..=120 are clamped at load time.
    #[serde(default = "default_expiration_minutes")]
    pub expiration_minutes: u64,
    /// Key under which the cart snapshot is persisted in the client
    /// key-value store.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Countdown tick period, in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl CartConfig {
    /// The configured deadline clamped into the accepted range.
    pub fn clamped_minutes(&self) -> u64 {
        self.expiration_minutes
            .clamp(MIN_EXPIRATION_MINUTES, MAX_EXPIRATION_MINUTES)
    }

    /// The cart lifetime as a chrono duration.
    pub fn expiration_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.clamped_minutes() as i64)
    }

    /// The countdown tick period as a std duration.
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            expiration_minutes: default_expiration_minutes(),
            storage_key: default_storage_key(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

fn default_expiration_minutes() -> u64 {
    15
}

fn default_storage_key() -> String {
    "cart-storage".to_string()
}

fn default_tick_interval_ms() -> u64 {
    1_000
}
