//! Session identity configuration.

use serde::{Deserialize, Serialize};

/// Settings for the session identity resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Key under which the anonymous session id is persisted in the client
    /// key-value store.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
        }
    }
}

fn default_storage_key() -> String {
    "anon_session_id".to_string()
}
