//! Seat/table lock configuration.

use serde::{Deserialize, Serialize};

/// Lock acquisition and hold settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocksConfig {
    /// How long an acquired lock is held before it expires, in minutes.
    /// Shorter than the cart deadline; the extend sweep bridges the
    /// difference for sessions that stay on the page.
    #[serde(default = "default_hold_minutes")]
    pub hold_minutes: u64,
    /// How close to expiry a held lock must be before the reaper marks it
    /// `expirando`, in seconds.
    #[serde(default = "default_expiring_threshold")]
    pub expiring_threshold_seconds: u64,
    /// Per-operation deadline for lock table calls, in milliseconds.
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
    /// Retry policy for transient datastore failures.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl LocksConfig {
    /// The lock hold as a chrono duration.
    pub fn hold_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.hold_minutes as i64)
    }

    /// The `expirando` threshold as a chrono duration.
    pub fn expiring_threshold(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.expiring_threshold_seconds as i64)
    }

    /// The per-operation deadline as a std duration.
    pub fn op_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.op_timeout_ms)
    }
}

impl Default for LocksConfig {
    fn default() -> Self {
        Self {
            hold_minutes: default_hold_minutes(),
            expiring_threshold_seconds: default_expiring_threshold(),
            op_timeout_ms: default_op_timeout_ms(),
            retry: RetryConfig::default(),
        }
    }
}

/// Exponential-backoff retry settings for transient failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound on any single delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_hold_minutes() -> u64 {
    10
}

fn default_expiring_threshold() -> u64 {
    120
}

fn default_op_timeout_ms() -> u64 {
    10_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    5_000
}
