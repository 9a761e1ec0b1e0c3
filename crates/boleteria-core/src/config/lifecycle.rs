//! Page-lifecycle coordinator configuration.

use serde::{Deserialize, Serialize};

/// Reaction-policy settings for visibility and unload signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Whether the periodic extend sweep runs at all.
    #[serde(default = "default_true")]
    pub auto_extend_enabled: bool,
    /// Extend sweep period, in seconds. Must leave headroom under the lock
    /// hold or held seats lapse between sweeps.
    #[serde(default = "default_auto_extend_interval")]
    pub auto_extend_interval_seconds: u64,
    /// Whether a non-empty cart asks for confirmation before unload.
    #[serde(default = "default_true")]
    pub confirm_unload: bool,
}

impl LifecycleConfig {
    /// The extend sweep period as a std duration.
    pub fn auto_extend_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.auto_extend_interval_seconds)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            auto_extend_enabled: true,
            auto_extend_interval_seconds: default_auto_extend_interval(),
            confirm_unload: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_auto_extend_interval() -> u64 {
    240
}
