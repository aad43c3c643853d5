//! Commerce lifecycle events consumed by the membership bridge.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{MembershipId, PlanId, UserId};

use super::plan::Membership;
use super::status::MembershipStatus;

/// Payload of a "membership saved" notification.
///
/// Fired by the commerce plugin on every save, including saves that change
/// nothing; `is_update` distinguishes a brand-new membership from an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipSaved {
    pub user_id: UserId,
    pub membership_id: MembershipId,
    pub is_update: bool,
}

/// Membership lifecycle events, as delivered by the commerce plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MembershipEvent {
    StatusChanged {
        membership: Membership,
        old_status: MembershipStatus,
        new_status: MembershipStatus,
    },
    Saved {
        plan_id: PlanId,
        saved: MembershipSaved,
    },
    Deleted {
        membership: Membership,
    },
}
