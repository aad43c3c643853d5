//! List visibility gating.
//!
//! A local list backed by a membership-plan content restriction must not
//! be offered to a reader who cannot view the gating content. Every list
//! render path (contact-list filtering, block-level available lists, the
//! list-management page) runs through this filter.

use std::sync::Arc;

use crate::application::sync::SyncContext;
use crate::domain::foundation::UserId;
use crate::domain::lists::{FormId, SubscriptionList};
use crate::ports::{AccessCheckError, CommerceError, ContentAccessChecker, MembershipPlanReader};

/// Visibility filter errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VisibilityError {
    #[error(transparent)]
    Commerce(#[from] CommerceError),

    #[error(transparent)]
    Access(#[from] AccessCheckError),
}

/// Filters subscription lists down to the ones a reader may join.
pub struct ListVisibilityFilter {
    plans: Arc<dyn MembershipPlanReader>,
    access: Arc<dyn ContentAccessChecker>,
}

impl ListVisibilityFilter {
    pub fn new(
        plans: Arc<dyn MembershipPlanReader>,
        access: Arc<dyn ContentAccessChecker>,
    ) -> Self {
        Self { plans, access }
    }

    /// Filters a set of local list ids.
    ///
    /// The current user is resolved from the context's acting user first,
    /// falling back to the ambient logged-in user.
    pub async fn filter_lists(
        &self,
        ctx: &SyncContext,
        ambient_user: Option<UserId>,
        form_ids: Vec<FormId>,
    ) -> Result<Vec<FormId>, VisibilityError> {
        let user = ctx.resolve_user(ambient_user);
        let mut visible = Vec::new();
        for form_id in form_ids {
            if self.is_visible(user, form_id).await? {
                visible.push(form_id);
            }
        }
        Ok(visible)
    }

    /// Filters full list objects, preserving order.
    pub async fn filter_list_objects(
        &self,
        ctx: &SyncContext,
        ambient_user: Option<UserId>,
        lists: Vec<SubscriptionList>,
    ) -> Result<Vec<SubscriptionList>, VisibilityError> {
        let user = ctx.resolve_user(ambient_user);
        let mut visible = Vec::new();
        for list in lists {
            if self.is_visible(user, list.form_id).await? {
                visible.push(list);
            }
        }
        Ok(visible)
    }

    /// A list with no plan association is always visible; a gated list is
    /// visible only to a user the commerce plugin grants view access to
    /// at least one gating plan.
    async fn is_visible(
        &self,
        user: Option<UserId>,
        form_id: FormId,
    ) -> Result<bool, VisibilityError> {
        let gating_plans = self.plans.plans_restricting(form_id).await?;
        if gating_plans.is_empty() {
            return Ok(true);
        }
        let Some(user) = user else {
            return Ok(false);
        };
        for plan_id in gating_plans {
            if self.access.can_view(user, plan_id).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryCommerce;
    use crate::domain::foundation::PlanId;
    use crate::domain::membership::MembershipPlan;

    fn commerce_with_gated_list() -> Arc<InMemoryCommerce> {
        Arc::new(
            InMemoryCommerce::new()
                .with_plan(
                    MembershipPlan::new(PlanId::new(5), "Supporters")
                        .with_restricted_list(FormId::new(41)),
                )
                .with_access(UserId::new(1), PlanId::new(5)),
        )
    }

    #[tokio::test]
    async fn ungated_list_is_always_included() {
        let commerce = commerce_with_gated_list();
        let filter = ListVisibilityFilter::new(commerce.clone(), commerce);

        let visible = filter
            .filter_lists(&SyncContext::new(), None, vec![FormId::new(99)])
            .await
            .unwrap();

        assert_eq!(visible, vec![FormId::new(99)]);
    }

    #[tokio::test]
    async fn gated_list_requires_access() {
        let commerce = commerce_with_gated_list();
        let filter = ListVisibilityFilter::new(commerce.clone(), commerce);

        // User 1 has access to the gating plan.
        let visible = filter
            .filter_lists(
                &SyncContext::new(),
                Some(UserId::new(1)),
                vec![FormId::new(41)],
            )
            .await
            .unwrap();
        assert_eq!(visible, vec![FormId::new(41)]);

        // User 2 does not.
        let visible = filter
            .filter_lists(
                &SyncContext::new(),
                Some(UserId::new(2)),
                vec![FormId::new(41)],
            )
            .await
            .unwrap();
        assert!(visible.is_empty());
    }

    #[tokio::test]
    async fn gated_list_is_hidden_from_anonymous_readers() {
        let commerce = commerce_with_gated_list();
        let filter = ListVisibilityFilter::new(commerce.clone(), commerce);

        let visible = filter
            .filter_lists(&SyncContext::new(), None, vec![FormId::new(41)])
            .await
            .unwrap();

        assert!(visible.is_empty());
    }

    #[tokio::test]
    async fn acting_user_overrides_ambient_user() {
        let commerce = commerce_with_gated_list();
        let filter = ListVisibilityFilter::new(commerce.clone(), commerce);

        // Ambient user 2 has no access, but the in-scope acting user 1
        // (a just-registered reader being granted a membership) does.
        let ctx = SyncContext::new().with_acting_user(UserId::new(1));
        let visible = filter
            .filter_lists(&ctx, Some(UserId::new(2)), vec![FormId::new(41)])
            .await
            .unwrap();

        assert_eq!(visible, vec![FormId::new(41)]);
    }

    #[tokio::test]
    async fn filter_list_objects_preserves_order() {
        let commerce = commerce_with_gated_list();
        let filter = ListVisibilityFilter::new(commerce.clone(), commerce);

        let lists = vec![
            SubscriptionList::new(FormId::new(99), "Open"),
            SubscriptionList::new(FormId::new(41), "Gated"),
            SubscriptionList::new(FormId::new(7), "Also open"),
        ];
        let visible = filter
            .filter_list_objects(&SyncContext::new(), Some(UserId::new(2)), lists)
            .await
            .unwrap();

        let ids: Vec<FormId> = visible.iter().map(|l| l.form_id).collect();
        assert_eq!(ids, vec![FormId::new(99), FormId::new(7)]);
    }
}
