//! Contact synchronization - the core sync engine and its vocabulary.

mod context;
mod engine;
mod error;

pub use context::SyncContext;
pub use engine::{ContactSyncEngine, ListAction};
pub use error::SyncError;
