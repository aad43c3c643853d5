//! Application layer - the sync core's services.
//!
//! Services depend on ports, never on adapters. The active provider is
//! injected at construction; callers thread a [`sync::SyncContext`]
//! through every operation.

pub mod membership;
pub mod resync;
pub mod send;
pub mod sync;
