//! Expired-lock reaper configuration.

use serde::{Deserialize, Serialize};

/// Settings for the server-side expiry sweep daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaperConfig {
    /// Whether the scheduled sweep is registered at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Six-field cron expression for the sweep schedule.
    #[serde(default = "default_schedule")]
    pub schedule: String,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            schedule: default_schedule(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_schedule() -> String {
    // Every minute, on the minute.
    "0 * * * * *".to_string()
}
