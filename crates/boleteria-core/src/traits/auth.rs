//! Authentication provider seam.
//!
//! The lock subsystem only ever asks one question of the auth layer: "who
//! is signed in right now, if anyone?". Everything else about
//! authentication is out of scope.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::result::AppResult;

/// Read-only view of the current authenticated session.
#[async_trait]
pub trait AuthProvider: Send + Sync + std::fmt::Debug + 'static {
    /// The authenticated user id, or `None` when browsing anonymously.
    ///
    /// Errors are tolerated by the identity resolver: it logs and falls
    /// back to the anonymous path rather than failing its caller.
    async fn current_user_id(&self) -> AppResult<Option<String>>;
}

/// Provider for flows with no authentication at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousAuthProvider;

#[async_trait]
impl AuthProvider for AnonymousAuthProvider {
    async fn current_user_id(&self) -> AppResult<Option<String>> {
        Ok(None)
    }
}

/// Provider backed by a settable in-memory user id.
///
/// Used by single-node demos and tests to simulate login/logout
/// transitions without a real auth stack.
#[derive(Debug, Default)]
pub struct StaticAuthProvider {
    user_id: RwLock<Option<String>>,
}

impl StaticAuthProvider {
    /// Create a provider with an initial signed-in user, or none.
    pub fn new(user_id: Option<String>) -> Self {
        Self {
            user_id: RwLock::new(user_id),
        }
    }

    /// Change the signed-in user (or sign out with `None`).
    pub fn set_user(&self, user_id: Option<String>) {
        let mut current = self.user_id.write().unwrap_or_else(|e| e.into_inner());
        *current = user_id;
    }
}

#[async_trait]
impl AuthProvider for StaticAuthProvider {
    async fn current_user_id(&self) -> AppResult<Option<String>> {
        Ok(self
            .user_id
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }
}
