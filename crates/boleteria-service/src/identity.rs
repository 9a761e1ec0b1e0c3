//! Session identity resolution.
//!
//! Every lock row and saved cart is scoped to a session id. Authenticated
//! visitors use their account id; everyone else gets a generated anonymous
//! id persisted in the profile store so it survives reloads.

use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use boleteria_core::config::session::SessionConfig;
use boleteria_core::traits::auth::AuthProvider;
use boleteria_core::traits::kv::KeyValueStore;
use boleteria_core::types::SessionId;

/// Resolves and caches the session id the rest of the services act as.
///
/// Resolution order: authenticated account id, then the id already cached
/// this process, then the persisted anonymous id, then a freshly generated
/// one. A login appearing mid-process always wins over a cached anonymous
/// id; the authenticated id is never written under the anonymous storage
/// key.
#[derive(Debug)]
pub struct SessionIdentity {
    auth: Arc<dyn AuthProvider>,
    profile: Arc<dyn KeyValueStore>,
    config: SessionConfig,
    cache: RwLock<Option<SessionId>>,
}

impl SessionIdentity {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        profile: Arc<dyn KeyValueStore>,
        config: SessionConfig,
    ) -> Self {
        Self {
            auth,
            profile,
            config,
            cache: RwLock::new(None),
        }
    }

    /// Resolve the session id this process acts as.
    ///
    /// Never fails: an auth or profile error is logged and resolution
    /// falls through to the next source, bottoming out at a generated id.
    pub async fn resolve(&self) -> SessionId {
        // ── Step 1: an authenticated account id wins outright ──
        match self.auth.current_user_id().await {
            Ok(Some(user_id)) => {
                let session = SessionId::new(user_id);
                let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
                if cache.as_ref() != Some(&session) {
                    debug!(session_id = %session, "Authenticated identity adopted");
                    *cache = Some(session.clone());
                }
                return session;
            }
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "Auth check failed, continuing as anonymous");
            }
        }

        // ── Step 2: whatever this process already resolved ──
        if let Some(session) = self.cache.read().unwrap_or_else(|e| e.into_inner()).clone() {
            return session;
        }

        // ── Step 3: the anonymous id persisted by an earlier run ──
        match self.profile.get(&self.config.storage_key).await {
            Ok(Some(stored)) if !stored.trim().is_empty() => {
                let session = SessionId::new(stored);
                debug!(session_id = %session, "Persisted anonymous identity reused");
                *self.cache.write().unwrap_or_else(|e| e.into_inner()) = Some(session.clone());
                return session;
            }
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "Profile read failed, generating a fresh identity");
            }
        }

        // ── Step 4: mint a new anonymous id and persist it best-effort ──
        let session = SessionId::generate();
        info!(session_id = %session, "Anonymous identity generated");
        if let Err(err) = self
            .profile
            .put(&self.config.storage_key, session.as_str())
            .await
        {
            // The id still serves this process; it just will not survive a restart.
            warn!(error = %err, "Anonymous identity could not be persisted");
        }
        *self.cache.write().unwrap_or_else(|e| e.into_inner()) = Some(session.clone());
        session
    }

    /// The id resolved so far, without touching auth or the profile store.
    ///
    /// Synchronous mirror reads use this; before the first [`resolve`]
    /// nothing is cached and ownership checks report `false`.
    ///
    /// [`resolve`]: Self::resolve
    pub fn cached(&self) -> Option<SessionId> {
        self.cache.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
