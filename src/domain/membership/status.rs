//! Membership status state machine.
//!
//! Mirrors the commerce plugin's membership lifecycle. The load-bearing
//! classification is `grants_access`: statuses split into an
//! active-equivalent set (the reader can use gated content) and everything
//! else, and list membership follows that split.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// Status of a WooCommerce membership (or subscription).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MembershipStatus {
    /// Fully active access.
    Active,

    /// Awaiting first payment; the commerce plugin already grants access.
    Pending,

    /// Cancellation requested, access continues until period end.
    PendingCancel,

    /// Access suspended, e.g. a paused subscription. Resumable.
    Paused,

    /// Cancelled by the reader or the site. No access.
    Cancelled,

    /// Ran out at period end. No access.
    Expired,
}

impl MembershipStatus {
    /// Returns true if this status is in the commerce plugin's
    /// "active access" set.
    pub fn grants_access(&self) -> bool {
        matches!(
            self,
            MembershipStatus::Active | MembershipStatus::Pending | MembershipStatus::PendingCancel
        )
    }

    /// Stable wire name, matching the commerce plugin's status slugs.
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Active => "active",
            MembershipStatus::Pending => "pending",
            MembershipStatus::PendingCancel => "pending-cancel",
            MembershipStatus::Paused => "paused",
            MembershipStatus::Cancelled => "cancelled",
            MembershipStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MembershipStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The commerce plugin prefixes stored statuses with "wcm-".
        match s.strip_prefix("wcm-").unwrap_or(s) {
            "active" => Ok(MembershipStatus::Active),
            "pending" => Ok(MembershipStatus::Pending),
            "pending-cancel" => Ok(MembershipStatus::PendingCancel),
            "paused" | "on-hold" => Ok(MembershipStatus::Paused),
            "cancelled" => Ok(MembershipStatus::Cancelled),
            "expired" => Ok(MembershipStatus::Expired),
            other => Err(ValidationError::invalid_format(
                "membership_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl StateMachine for MembershipStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use MembershipStatus::*;
        matches!(
            (self, target),
            // From PENDING
            (Pending, Active)
                | (Pending, Cancelled)
                | (Pending, Expired)
            // From ACTIVE
                | (Active, Active) // Renewal
                | (Active, PendingCancel)
                | (Active, Paused)
                | (Active, Cancelled)
                | (Active, Expired)
            // From PENDING-CANCEL
                | (PendingCancel, Active)
                | (PendingCancel, Cancelled)
            // From PAUSED
                | (Paused, Active)
                | (Paused, Cancelled)
                | (Paused, Expired)
            // From CANCELLED / EXPIRED (resubscribe)
                | (Cancelled, Active)
                | (Expired, Active)
                | (Expired, Pending)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use MembershipStatus::*;
        match self {
            Pending => vec![Active, Cancelled, Expired],
            Active => vec![Active, PendingCancel, Paused, Cancelled, Expired],
            PendingCancel => vec![Active, Cancelled],
            Paused => vec![Active, Cancelled, Expired],
            Cancelled => vec![Active],
            Expired => vec![Active, Pending],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_equivalent_statuses_grant_access() {
        assert!(MembershipStatus::Active.grants_access());
        assert!(MembershipStatus::Pending.grants_access());
        assert!(MembershipStatus::PendingCancel.grants_access());
    }

    #[test]
    fn inactive_equivalent_statuses_do_not_grant_access() {
        assert!(!MembershipStatus::Paused.grants_access());
        assert!(!MembershipStatus::Cancelled.grants_access());
        assert!(!MembershipStatus::Expired.grants_access());
    }

    #[test]
    fn wcm_prefix_is_stripped_when_parsing() {
        assert_eq!(
            "wcm-paused".parse::<MembershipStatus>().unwrap(),
            MembershipStatus::Paused
        );
    }

    #[test]
    fn on_hold_maps_to_paused() {
        assert_eq!(
            "on-hold".parse::<MembershipStatus>().unwrap(),
            MembershipStatus::Paused
        );
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!("limbo".parse::<MembershipStatus>().is_err());
    }

    #[test]
    fn paused_can_reactivate() {
        let result = MembershipStatus::Paused.transition_to(MembershipStatus::Active);
        assert_eq!(result, Ok(MembershipStatus::Active));
    }

    #[test]
    fn active_can_renew_to_active() {
        assert!(MembershipStatus::Active.can_transition_to(&MembershipStatus::Active));
    }

    #[test]
    fn valid_transitions_are_consistent_with_can_transition_to() {
        for status in [
            MembershipStatus::Active,
            MembershipStatus::Pending,
            MembershipStatus::PendingCancel,
            MembershipStatus::Paused,
            MembershipStatus::Cancelled,
            MembershipStatus::Expired,
        ] {
            for target in status.valid_transitions() {
                assert!(
                    status.can_transition_to(&target),
                    "can_transition_to should return true for {:?} -> {:?}",
                    status,
                    target
                );
            }
        }
    }
}
