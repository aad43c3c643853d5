//! WooCommerce Membership Bridge.
//!
//! Translates commerce membership lifecycle events into list membership
//! changes, driven entirely through the contact sync engine. The bridge
//! never talks to a provider directly.
//!
//! Both sides of a status transition arrive together: the event carries
//! the old and the new status, so deactivation and reactivation are one
//! atomic decision with no ordering dependency between separate handlers
//! and no previous-status cache. The "saved" notification matters only
//! for the one case a status change cannot see, the initial grant of a
//! brand-new membership.

use std::sync::Arc;

use crate::application::sync::{ContactSyncEngine, SyncContext, SyncError};
use crate::domain::contact::EmailAddress;
use crate::domain::foundation::{PlanId, UserId};
use crate::domain::lists::ListTarget;
use crate::domain::membership::{Membership, MembershipEvent, MembershipSaved, MembershipStatus};
use crate::ports::{
    CommerceError, CustomerReader, MembershipPlanReader, SnapshotStore, SnapshotStoreError,
};

/// Bridge errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Commerce(#[from] CommerceError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotStoreError),
}

/// What the bridge did with an event, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeOutcome {
    /// Lists removed; the removed subset was snapshotted first.
    Deactivated { removed: Vec<ListTarget> },
    /// Lists re-added after intersection with the snapshot.
    Reactivated { added: Vec<ListTarget> },
    /// Lists granted to a brand-new membership.
    InitialGrant { added: Vec<ListTarget> },
    /// Nothing to do.
    Noop { reason: &'static str },
}

/// Listens to commerce membership lifecycle events and keeps list
/// memberships in step.
pub struct MembershipBridge {
    engine: Arc<ContactSyncEngine>,
    snapshots: Arc<dyn SnapshotStore>,
    plans: Arc<dyn MembershipPlanReader>,
    customers: Arc<dyn CustomerReader>,
    /// When on, readers pick newsletters at checkout: new memberships are
    /// not auto-subscribed, and only a paused membership resuming with
    /// snapshot evidence is resubscribed.
    post_checkout_signup: bool,
}

impl MembershipBridge {
    pub fn new(
        engine: Arc<ContactSyncEngine>,
        snapshots: Arc<dyn SnapshotStore>,
        plans: Arc<dyn MembershipPlanReader>,
        customers: Arc<dyn CustomerReader>,
    ) -> Self {
        Self {
            engine,
            snapshots,
            plans,
            customers,
            post_checkout_signup: false,
        }
    }

    /// Enables the post-checkout newsletter signup behavior.
    pub fn with_post_checkout_signup(mut self, enabled: bool) -> Self {
        self.post_checkout_signup = enabled;
        self
    }

    /// Dispatches a commerce event, logging the outcome.
    ///
    /// Failures are logged and swallowed here so a sync problem never
    /// breaks the commerce plugin's own event dispatch; callers that
    /// need the error use the typed handlers directly.
    pub async fn dispatch(&self, ctx: &SyncContext, event: MembershipEvent) {
        let result = match event {
            MembershipEvent::StatusChanged {
                membership,
                old_status,
                new_status,
            } => {
                self.handle_status_changed(ctx, &membership, old_status, new_status)
                    .await
            }
            MembershipEvent::Saved { plan_id, saved } => {
                self.handle_membership_saved(ctx, plan_id, saved).await
            }
            MembershipEvent::Deleted { membership } => {
                self.handle_membership_deleted(ctx, &membership).await
            }
        };
        match result {
            Ok(outcome) => {
                tracing::info!("[{}] membership bridge: {:?}", ctx.request_id, outcome);
            }
            Err(err) => {
                tracing::error!("[{}] membership bridge failed: {}", ctx.request_id, err);
            }
        }
    }

    /// Handles a membership status transition with both statuses known.
    pub async fn handle_status_changed(
        &self,
        ctx: &SyncContext,
        membership: &Membership,
        old_status: MembershipStatus,
        new_status: MembershipStatus,
    ) -> Result<BridgeOutcome, BridgeError> {
        match (old_status.grants_access(), new_status.grants_access()) {
            (true, false) => self.deactivate(ctx, membership).await,
            (false, true) => self.reactivate(ctx, membership, old_status).await,
            _ => Ok(BridgeOutcome::Noop {
                reason: "status change does not cross the active boundary",
            }),
        }
    }

    /// Handles a membership save. Only a brand-new membership acts here;
    /// every status transition of an existing membership is covered by
    /// [`Self::handle_status_changed`].
    pub async fn handle_membership_saved(
        &self,
        ctx: &SyncContext,
        plan_id: PlanId,
        saved: MembershipSaved,
    ) -> Result<BridgeOutcome, BridgeError> {
        if saved.is_update {
            return Ok(BridgeOutcome::Noop {
                reason: "update saves are handled by the status transition",
            });
        }
        if self.post_checkout_signup {
            // The reader already chose their newsletters at checkout.
            return Ok(BridgeOutcome::Noop {
                reason: "post-checkout signup handles new memberships",
            });
        }

        let plan_targets = self.plan_targets(plan_id).await?;
        if plan_targets.is_empty() {
            return Ok(BridgeOutcome::Noop {
                reason: "plan restricts no lists",
            });
        }
        let email = self.reader_email(saved.user_id).await?;
        let current = self.engine.get_contact_combined_lists(ctx, &email).await?;
        let to_add: Vec<ListTarget> = plan_targets
            .into_iter()
            .filter(|t| !current.contains(t))
            .collect();
        if to_add.is_empty() {
            return Ok(BridgeOutcome::Noop {
                reason: "reader already holds every plan list",
            });
        }

        self.engine
            .update_contact_lists_handling_local(ctx, &email, to_add.clone(), Vec::new())
            .await?;
        Ok(BridgeOutcome::InitialGrant { added: to_add })
    }

    /// Handles a membership deletion: unconditional removal, same logic
    /// as deactivation.
    pub async fn handle_membership_deleted(
        &self,
        ctx: &SyncContext,
        membership: &Membership,
    ) -> Result<BridgeOutcome, BridgeError> {
        self.deactivate(ctx, membership).await
    }

    async fn deactivate(
        &self,
        ctx: &SyncContext,
        membership: &Membership,
    ) -> Result<BridgeOutcome, BridgeError> {
        let plan_targets = self.plan_targets(membership.plan_id).await?;
        if plan_targets.is_empty() {
            return Ok(BridgeOutcome::Noop {
                reason: "plan restricts no lists",
            });
        }
        let email = self.reader_email(membership.user_id).await?;
        let current = self.engine.get_contact_combined_lists(ctx, &email).await?;

        // Only the lists the reader actually holds right now, not the
        // full plan set, since the reader may have left some manually.
        let held: Vec<ListTarget> = plan_targets
            .into_iter()
            .filter(|t| current.contains(t))
            .collect();

        let mut snapshot = self.snapshots.load(membership.user_id).await?;
        snapshot.record(membership.id, held.clone());
        self.snapshots.store(membership.user_id, &snapshot).await?;

        if !held.is_empty() {
            self.engine
                .update_contact_lists_handling_local(ctx, &email, Vec::new(), held.clone())
                .await?;
        }
        Ok(BridgeOutcome::Deactivated { removed: held })
    }

    async fn reactivate(
        &self,
        ctx: &SyncContext,
        membership: &Membership,
        old_status: MembershipStatus,
    ) -> Result<BridgeOutcome, BridgeError> {
        let plan_targets = self.plan_targets(membership.plan_id).await?;
        if plan_targets.is_empty() {
            return Ok(BridgeOutcome::Noop {
                reason: "plan restricts no lists",
            });
        }
        let email = self.reader_email(membership.user_id).await?;

        let mut snapshot = self.snapshots.load(membership.user_id).await?;
        let recorded = snapshot.lists_for(membership.id).map(<[ListTarget]>::to_vec);

        if self.post_checkout_signup {
            let has_evidence = recorded.as_ref().map(|r| !r.is_empty()).unwrap_or(false);
            if old_status != MembershipStatus::Paused || !has_evidence {
                return Ok(BridgeOutcome::Noop {
                    reason: "post-checkout signup only resumes paused memberships with a snapshot",
                });
            }
        }

        let current = self.engine.get_contact_combined_lists(ctx, &email).await?;
        let mut to_add: Vec<ListTarget> = plan_targets
            .into_iter()
            .filter(|t| !current.contains(t))
            .collect();

        // Never resubscribe to a list the reader wasn't on before the
        // membership was deactivated.
        if let Some(recorded) = &recorded {
            to_add.retain(|t| recorded.contains(t));
        }

        if !to_add.is_empty() {
            self.engine
                .update_contact_lists_handling_local(ctx, &email, to_add.clone(), Vec::new())
                .await?;
        }

        // The snapshot entry is consumed by a successful reactivation.
        if snapshot.consume(membership.id).is_some() {
            self.snapshots.store(membership.user_id, &snapshot).await?;
        }
        Ok(BridgeOutcome::Reactivated { added: to_add })
    }

    async fn plan_targets(&self, plan_id: PlanId) -> Result<Vec<ListTarget>, BridgeError> {
        let plan = self.plans.get_plan(plan_id).await?;
        Ok(plan
            .restricted_lists
            .into_iter()
            .map(ListTarget::Local)
            .collect())
    }

    async fn reader_email(&self, user_id: UserId) -> Result<EmailAddress, BridgeError> {
        let customer = self.customers.get_customer(user_id).await?;
        Ok(customer.resolved_email().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryCommerce, InMemoryListRegistry, InMemorySnapshotStore};
    use crate::adapters::providers::{MockCall, MockEspProvider};
    use crate::domain::foundation::{MembershipId, UserId};
    use crate::domain::lists::{
        FormId, NativeListId, ProviderListSettings, SubscriptionList, TagId,
    };
    use crate::domain::membership::MembershipPlan;
    use crate::domain::provider::ProviderKind;

    const READER: u64 = 10;
    const PLAN: u64 = 5;
    const MEMBERSHIP: u64 = 77;

    struct Fixture {
        provider: Arc<MockEspProvider>,
        snapshots: Arc<InMemorySnapshotStore>,
        bridge: MembershipBridge,
        email: EmailAddress,
    }

    /// Plan restricts local lists A=41, B=42, C=43, each backed by
    /// LA/LB/LC with tags TA/TB/TC.
    fn fixture(post_checkout: bool) -> Fixture {
        let provider = Arc::new(MockEspProvider::new(ProviderKind::Mailchimp));
        let mut registry = InMemoryListRegistry::new();
        for (form, list, tag) in [(41, "LA", "TA"), (42, "LB", "TB"), (43, "LC", "TC")] {
            registry = registry.with_list(
                SubscriptionList::new(FormId::new(form), format!("List {}", form))
                    .with_provider_settings(
                        ProviderKind::Mailchimp,
                        ProviderListSettings::new(NativeListId::new(list), TagId::new(tag)),
                    ),
            );
        }
        let engine = Arc::new(ContactSyncEngine::new(
            provider.clone(),
            Arc::new(registry),
        ));
        let snapshots = Arc::new(InMemorySnapshotStore::new());
        let email = EmailAddress::new("reader@example.com").unwrap();
        let commerce = Arc::new(
            InMemoryCommerce::new()
                .with_customer(UserId::new(READER), email.clone())
                .with_plan(
                    MembershipPlan::new(PlanId::new(PLAN), "Supporters")
                        .with_restricted_list(FormId::new(41))
                        .with_restricted_list(FormId::new(42))
                        .with_restricted_list(FormId::new(43)),
                ),
        );
        let bridge = MembershipBridge::new(
            engine,
            snapshots.clone(),
            commerce.clone(),
            commerce,
        )
        .with_post_checkout_signup(post_checkout);
        Fixture {
            provider,
            snapshots,
            bridge,
            email,
        }
    }

    fn membership(status: MembershipStatus) -> Membership {
        Membership::new(
            MembershipId::new(MEMBERSHIP),
            UserId::new(READER),
            PlanId::new(PLAN),
            status,
        )
    }

    /// Puts the reader on local lists A and B (tags on backing lists).
    fn subscribe_to_a_and_b(f: &Fixture) {
        f.provider.seed_contact_on_lists(&f.email, &["LA", "LB"]);
        f.provider.seed_contact_tag(&f.email, "LA", "TA");
        f.provider.seed_contact_tag(&f.email, "LB", "TB");
    }

    #[tokio::test]
    async fn deactivation_snapshots_and_removes_exactly_the_held_subset() {
        let f = fixture(false);
        subscribe_to_a_and_b(&f);

        let outcome = f
            .bridge
            .handle_status_changed(
                &SyncContext::new(),
                &membership(MembershipStatus::Cancelled),
                MembershipStatus::Active,
                MembershipStatus::Cancelled,
            )
            .await
            .unwrap();

        // [A, B] held of plan [A, B, C]: snapshot and removal are exactly
        // [A, B], never C.
        let expected = vec![
            ListTarget::parse("local-41"),
            ListTarget::parse("local-42"),
        ];
        assert_eq!(outcome, BridgeOutcome::Deactivated { removed: expected.clone() });

        let snapshot = f.snapshots.load(UserId::new(READER)).await.unwrap();
        assert_eq!(
            snapshot.lists_for(MembershipId::new(MEMBERSHIP)),
            Some(expected.as_slice())
        );
        assert_eq!(f.provider.contact_tags_snapshot(&f.email), vec![]);
    }

    #[tokio::test]
    async fn reactivation_respects_snapshot_intersection() {
        let f = fixture(false);
        // Snapshot of [A] only; reader currently on none of the lists.
        f.provider.seed_contact_on_lists(&f.email, &[]);
        let mut snapshot = f.snapshots.load(UserId::new(READER)).await.unwrap();
        snapshot.record(
            MembershipId::new(MEMBERSHIP),
            vec![ListTarget::parse("local-41")],
        );
        f.snapshots
            .store(UserId::new(READER), &snapshot)
            .await
            .unwrap();

        let outcome = f
            .bridge
            .handle_status_changed(
                &SyncContext::new(),
                &membership(MembershipStatus::Active),
                MembershipStatus::Paused,
                MembershipStatus::Active,
            )
            .await
            .unwrap();

        assert_eq!(
            outcome,
            BridgeOutcome::Reactivated {
                added: vec![ListTarget::parse("local-41")]
            }
        );
        // Only A's tag came back; B and C were never added.
        assert_eq!(f.provider.contact_tags_snapshot(&f.email), vec![TagId::new("TA")]);
        // The snapshot entry was consumed.
        let after = f.snapshots.load(UserId::new(READER)).await.unwrap();
        assert!(after.lists_for(MembershipId::new(MEMBERSHIP)).is_none());
    }

    #[tokio::test]
    async fn redundant_reactivation_is_a_noop() {
        let f = fixture(false);
        subscribe_to_a_and_b(&f);

        let outcome = f
            .bridge
            .handle_status_changed(
                &SyncContext::new(),
                &membership(MembershipStatus::Active),
                MembershipStatus::Pending,
                MembershipStatus::Active,
            )
            .await
            .unwrap();

        // Pending and Active are both active-equivalent: nothing happens.
        assert!(matches!(outcome, BridgeOutcome::Noop { .. }));
        assert!(f.provider.calls().is_empty());
    }

    #[tokio::test]
    async fn redundant_deactivation_is_a_noop() {
        let f = fixture(false);

        let outcome = f
            .bridge
            .handle_status_changed(
                &SyncContext::new(),
                &membership(MembershipStatus::Expired),
                MembershipStatus::Cancelled,
                MembershipStatus::Expired,
            )
            .await
            .unwrap();

        assert!(matches!(outcome, BridgeOutcome::Noop { .. }));
        assert!(f.provider.calls().is_empty());
    }

    #[tokio::test]
    async fn reactivation_skips_lists_already_held() {
        let f = fixture(false);
        // Reader still holds A; snapshot says they had A and B.
        f.provider.seed_contact_on_lists(&f.email, &["LA"]);
        f.provider.seed_contact_tag(&f.email, "LA", "TA");
        let mut snapshot = f.snapshots.load(UserId::new(READER)).await.unwrap();
        snapshot.record(
            MembershipId::new(MEMBERSHIP),
            vec![ListTarget::parse("local-41"), ListTarget::parse("local-42")],
        );
        f.snapshots
            .store(UserId::new(READER), &snapshot)
            .await
            .unwrap();

        let outcome = f
            .bridge
            .handle_status_changed(
                &SyncContext::new(),
                &membership(MembershipStatus::Active),
                MembershipStatus::Paused,
                MembershipStatus::Active,
            )
            .await
            .unwrap();

        // A is already held, so only B is added.
        assert_eq!(
            outcome,
            BridgeOutcome::Reactivated {
                added: vec![ListTarget::parse("local-42")]
            }
        );
    }

    #[tokio::test]
    async fn post_checkout_flag_requires_paused_origin_and_snapshot() {
        let f = fixture(true);
        f.provider.seed_contact_on_lists(&f.email, &[]);

        // Cancelled → Active with no snapshot: skipped entirely.
        let outcome = f
            .bridge
            .handle_status_changed(
                &SyncContext::new(),
                &membership(MembershipStatus::Active),
                MembershipStatus::Cancelled,
                MembershipStatus::Active,
            )
            .await
            .unwrap();
        assert!(matches!(outcome, BridgeOutcome::Noop { .. }));
        assert!(f.provider.calls().is_empty());

        // Paused → Active with a non-empty snapshot: proceeds.
        let mut snapshot = f.snapshots.load(UserId::new(READER)).await.unwrap();
        snapshot.record(
            MembershipId::new(MEMBERSHIP),
            vec![ListTarget::parse("local-41")],
        );
        f.snapshots
            .store(UserId::new(READER), &snapshot)
            .await
            .unwrap();

        let outcome = f
            .bridge
            .handle_status_changed(
                &SyncContext::new(),
                &membership(MembershipStatus::Active),
                MembershipStatus::Paused,
                MembershipStatus::Active,
            )
            .await
            .unwrap();
        assert_eq!(
            outcome,
            BridgeOutcome::Reactivated {
                added: vec![ListTarget::parse("local-41")]
            }
        );
    }

    #[tokio::test]
    async fn brand_new_membership_gets_the_initial_grant() {
        let f = fixture(false);
        f.provider.seed_contact_on_lists(&f.email, &["LA"]);
        f.provider.seed_contact_tag(&f.email, "LA", "TA");

        let outcome = f
            .bridge
            .handle_membership_saved(
                &SyncContext::new(),
                PlanId::new(PLAN),
                MembershipSaved {
                    user_id: UserId::new(READER),
                    membership_id: MembershipId::new(MEMBERSHIP),
                    is_update: false,
                },
            )
            .await
            .unwrap();

        // Already on A; granted B and C.
        assert_eq!(
            outcome,
            BridgeOutcome::InitialGrant {
                added: vec![ListTarget::parse("local-42"), ListTarget::parse("local-43")]
            }
        );
    }

    #[tokio::test]
    async fn update_saves_are_noops() {
        let f = fixture(false);
        let outcome = f
            .bridge
            .handle_membership_saved(
                &SyncContext::new(),
                PlanId::new(PLAN),
                MembershipSaved {
                    user_id: UserId::new(READER),
                    membership_id: MembershipId::new(MEMBERSHIP),
                    is_update: true,
                },
            )
            .await
            .unwrap();

        assert!(matches!(outcome, BridgeOutcome::Noop { .. }));
        assert!(f.provider.calls().is_empty());
    }

    #[tokio::test]
    async fn deletion_removes_unconditionally() {
        let f = fixture(false);
        subscribe_to_a_and_b(&f);

        let outcome = f
            .bridge
            .handle_membership_deleted(
                &SyncContext::new(),
                &membership(MembershipStatus::Active),
            )
            .await
            .unwrap();

        assert!(matches!(outcome, BridgeOutcome::Deactivated { .. }));
        assert_eq!(f.provider.contact_tags_snapshot(&f.email), vec![]);
    }

    #[tokio::test]
    async fn snapshots_of_other_memberships_survive() {
        let f = fixture(false);
        subscribe_to_a_and_b(&f);
        let other = MembershipId::new(999);
        let mut snapshot = f.snapshots.load(UserId::new(READER)).await.unwrap();
        snapshot.record(other, vec![ListTarget::parse("local-43")]);
        f.snapshots
            .store(UserId::new(READER), &snapshot)
            .await
            .unwrap();

        f.bridge
            .handle_status_changed(
                &SyncContext::new(),
                &membership(MembershipStatus::Paused),
                MembershipStatus::Active,
                MembershipStatus::Paused,
            )
            .await
            .unwrap();

        let after = f.snapshots.load(UserId::new(READER)).await.unwrap();
        assert!(after.lists_for(other).is_some());
        assert!(after.lists_for(MembershipId::new(MEMBERSHIP)).is_some());
    }

    #[tokio::test]
    async fn dispatch_swallows_failures() {
        let f = fixture(false);
        // Unknown plan id: the typed handler would fail.
        let event = MembershipEvent::Deleted {
            membership: Membership::new(
                MembershipId::new(1),
                UserId::new(READER),
                PlanId::new(404),
                MembershipStatus::Active,
            ),
        };
        // Must not panic or propagate.
        f.bridge.dispatch(&SyncContext::new(), event).await;
        assert!(!f
            .provider
            .calls()
            .iter()
            .any(|c| matches!(c, MockCall::UpdateContactLists { .. })));
    }
}
