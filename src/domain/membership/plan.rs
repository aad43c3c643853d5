//! Membership records and plans.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{MembershipId, PlanId, UserId};
use crate::domain::lists::FormId;

use super::status::MembershipStatus;

/// A reader's membership in a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: MembershipId,
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub status: MembershipStatus,
}

impl Membership {
    pub fn new(
        id: MembershipId,
        user_id: UserId,
        plan_id: PlanId,
        status: MembershipStatus,
    ) -> Self {
        Self {
            id,
            user_id,
            plan_id,
            status,
        }
    }
}

/// A membership plan, reduced to what list sync needs: the local lists the
/// plan's content-restriction rules reference.
///
/// The commerce plugin stores restriction rules per content type; scanning
/// them for rules whose content type is the subscription-list type yields
/// this set. That scan happens in the commerce adapter; the domain only
/// sees its result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipPlan {
    pub id: PlanId,
    pub name: String,
    /// Local lists gated by (and granted with) this plan.
    pub restricted_lists: Vec<FormId>,
}

impl MembershipPlan {
    pub fn new(id: PlanId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            restricted_lists: Vec::new(),
        }
    }

    /// Adds a local list to the plan's restriction set.
    pub fn with_restricted_list(mut self, form_id: FormId) -> Self {
        self.restricted_lists.push(form_id);
        self
    }

    /// True when the plan gates the given local list.
    pub fn restricts(&self, form_id: FormId) -> bool {
        self.restricted_lists.contains(&form_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_reports_restricted_lists() {
        let plan = MembershipPlan::new(PlanId::new(5), "Supporters")
            .with_restricted_list(FormId::new(42))
            .with_restricted_list(FormId::new(43));

        assert!(plan.restricts(FormId::new(42)));
        assert!(!plan.restricts(FormId::new(99)));
    }
}
