//! Page-lifecycle signals delivered by the hosting shell.

use serde::{Deserialize, Serialize};

/// Externally observed page/tab lifecycle transitions.
///
/// The hosting UI shell detects these; the coordinator only defines the
/// reaction policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleSignal {
    /// The tab was switched away or minimized. Timers may be throttled
    /// from here on.
    Hidden,
    /// The tab became visible again.
    Visible,
    /// The page is about to unload; a custom prompt is advisory at best.
    BeforeUnload,
    /// The booking flow is being dismantled for good (navigation away,
    /// app shutdown).
    Teardown,
}

impl std::fmt::Display for LifecycleSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hidden => write!(f, "hidden"),
            Self::Visible => write!(f, "visible"),
            Self::BeforeUnload => write!(f, "before_unload"),
            Self::Teardown => write!(f, "teardown"),
        }
    }
}
