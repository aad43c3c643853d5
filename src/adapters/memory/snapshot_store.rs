//! In-memory deactivation snapshot store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::foundation::UserId;
use crate::domain::membership::DeactivationSnapshot;
use crate::ports::{SnapshotStore, SnapshotStoreError};

/// In-memory implementation of the `SnapshotStore` port.
#[derive(Default)]
pub struct InMemorySnapshotStore {
    snapshots: RwLock<HashMap<UserId, DeactivationSnapshot>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn load(&self, user_id: UserId) -> Result<DeactivationSnapshot, SnapshotStoreError> {
        Ok(self
            .snapshots
            .read()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn store(
        &self,
        user_id: UserId,
        snapshot: &DeactivationSnapshot,
    ) -> Result<(), SnapshotStoreError> {
        self.snapshots
            .write()
            .unwrap()
            .insert(user_id, snapshot.clone());
        Ok(())
    }
}
