//! Content Access Checker Port - the commerce plugin's view-access check.

use async_trait::async_trait;

use crate::domain::foundation::{PlanId, UserId};

/// Asks the commerce plugin whether a user can currently view content
/// gated by a membership plan.
///
/// Used by the list visibility filter: a reader must never be offered a
/// list they structurally cannot join.
#[async_trait]
pub trait ContentAccessChecker: Send + Sync {
    async fn can_view(&self, user_id: UserId, plan_id: PlanId) -> Result<bool, AccessCheckError>;
}

/// Access check errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("access check failed: {0}")]
pub struct AccessCheckError(pub String);

impl AccessCheckError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
