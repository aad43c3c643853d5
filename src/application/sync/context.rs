//! Request-scoped sync context.

use uuid::Uuid;

use crate::domain::foundation::UserId;

/// Context threaded explicitly through every sync call chain.
///
/// Replaces ambient request-scoped state: the acting user (set when
/// processing a membership grant for a not-yet-logged-in registrant)
/// travels with the call instead of living in a global, and the request
/// id ties log lines from one logical operation together.
#[derive(Debug, Clone)]
pub struct SyncContext {
    pub request_id: Uuid,
    /// Explicit in-scope user; takes precedence over the ambient
    /// logged-in user wherever a "current user" is resolved.
    pub acting_user_id: Option<UserId>,
}

impl SyncContext {
    /// Creates a context with a fresh request id and no acting user.
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            acting_user_id: None,
        }
    }

    /// Sets the acting user.
    pub fn with_acting_user(mut self, user_id: UserId) -> Self {
        self.acting_user_id = Some(user_id);
        self
    }

    /// Resolves the current user: the explicit acting user wins over the
    /// ambient one.
    pub fn resolve_user(&self, ambient: Option<UserId>) -> Option<UserId> {
        self.acting_user_id.or(ambient)
    }
}

impl Default for SyncContext {
    fn default() -> Self {
        Self::new()
    }
}
