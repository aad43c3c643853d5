//! Deactivation snapshots.
//!
//! When a membership leaves the active-equivalent set, the subset of its
//! plan's lists the reader was actually on at that moment is recorded per
//! (user, membership). Reactivation intersects with this record so a reader
//! is never resubscribed to a list they had already left.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::foundation::MembershipId;
use crate::domain::lists::ListTarget;

/// Per-reader record of list memberships at deactivation time, keyed by
/// membership id.
///
/// Entries are written on every deactivation and consumed on reactivation.
/// Cardinality is bounded by the number of memberships a reader holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeactivationSnapshot {
    entries: HashMap<MembershipId, Vec<ListTarget>>,
}

impl DeactivationSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the lists held at deactivation, replacing any prior entry
    /// for the membership.
    pub fn record(&mut self, membership: MembershipId, lists: Vec<ListTarget>) {
        self.entries.insert(membership, lists);
    }

    /// The recorded lists for a membership, if any.
    pub fn lists_for(&self, membership: MembershipId) -> Option<&[ListTarget]> {
        self.entries.get(&membership).map(Vec::as_slice)
    }

    /// Removes and returns the entry for a membership.
    pub fn consume(&mut self, membership: MembershipId) -> Option<Vec<ListTarget>> {
        self.entries.remove(&membership)
    }

    /// True when no membership has a recorded entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lists::FormId;

    fn targets(ids: &[u64]) -> Vec<ListTarget> {
        ids.iter().map(|&n| ListTarget::Local(FormId::new(n))).collect()
    }

    #[test]
    fn record_replaces_prior_entry() {
        let mut snapshot = DeactivationSnapshot::new();
        let membership = MembershipId::new(1);
        snapshot.record(membership, targets(&[42, 43]));
        snapshot.record(membership, targets(&[42]));

        assert_eq!(snapshot.lists_for(membership), Some(targets(&[42]).as_slice()));
    }

    #[test]
    fn consume_removes_the_entry() {
        let mut snapshot = DeactivationSnapshot::new();
        let membership = MembershipId::new(1);
        snapshot.record(membership, targets(&[42]));

        assert_eq!(snapshot.consume(membership), Some(targets(&[42])));
        assert!(snapshot.lists_for(membership).is_none());
        assert!(snapshot.is_empty());
    }

    #[test]
    fn entries_are_scoped_per_membership() {
        let mut snapshot = DeactivationSnapshot::new();
        snapshot.record(MembershipId::new(1), targets(&[42]));
        snapshot.record(MembershipId::new(2), targets(&[43]));

        snapshot.consume(MembershipId::new(1));
        assert_eq!(
            snapshot.lists_for(MembershipId::new(2)),
            Some(targets(&[43]).as_slice())
        );
    }
}
