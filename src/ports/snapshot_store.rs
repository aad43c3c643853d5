//! Snapshot Store Port - persistence for deactivation snapshots.

use async_trait::async_trait;

use crate::domain::foundation::UserId;
use crate::domain::membership::DeactivationSnapshot;

/// Persistence for per-reader deactivation snapshots.
///
/// The full snapshot map is read, mutated, and written back; the write is
/// last-writer-wins. Concurrent membership changes for the same reader are
/// rare enough that no locking is layered on top.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Loads a reader's snapshot; an absent record is an empty snapshot.
    async fn load(&self, user_id: UserId) -> Result<DeactivationSnapshot, SnapshotStoreError>;

    /// Writes a reader's snapshot, replacing the stored value.
    async fn store(
        &self,
        user_id: UserId,
        snapshot: &DeactivationSnapshot,
    ) -> Result<(), SnapshotStoreError>;
}

/// Snapshot persistence errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("snapshot storage error: {0}")]
pub struct SnapshotStoreError(pub String);

impl SnapshotStoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
