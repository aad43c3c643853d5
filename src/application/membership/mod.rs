//! Commerce membership integration - bridge and visibility gating.

mod bridge;
mod visibility;

pub use bridge::{BridgeError, BridgeOutcome, MembershipBridge};
pub use visibility::{ListVisibilityFilter, VisibilityError};
