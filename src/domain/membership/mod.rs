//! Membership domain - commerce-driven list membership state.

mod events;
mod plan;
mod snapshot;
mod status;

pub use events::{MembershipEvent, MembershipSaved};
pub use plan::{Membership, MembershipPlan};
pub use snapshot::DeactivationSnapshot;
pub use status::MembershipStatus;
