//! WooCommerce bulk resync.
//!
//! Re-derives and re-pushes contact data for many customers,
//! subscriptions, or orders. One selection mode runs per invocation, in
//! priority order; batched modes page until the source is exhausted or
//! the batch cap is hit. Per-item failures are logged and skipped; only
//! the top-level capability gate aborts a run, and dry-run proceeds even
//! past that, since nothing is actually sent.

use std::sync::Arc;

use crate::application::sync::{ContactSyncEngine, SyncContext, SyncError};
use crate::domain::contact::Contact;
use crate::domain::foundation::{OrderId, SubscriptionId, UserId};
use crate::ports::{
    CommerceError, Customer, CustomerReader, MigrationSource, Order, OrderReader,
    SubscriptionReader,
};

/// Default page size for batched modes.
pub const DEFAULT_BATCH_SIZE: u64 = 10;

/// What to resync and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResyncConfig {
    /// Compute and log, but never call the provider.
    pub dry_run: bool,
    /// Skip users/subscriptions without an active-equivalent subscription.
    pub active_only: bool,
    /// Resync subscriptions migrated from this source.
    pub migrated_source: Option<MigrationSource>,
    /// Explicit subscription ids. Highest priority.
    pub subscription_ids: Vec<SubscriptionId>,
    /// Explicit order ids.
    pub order_ids: Vec<OrderId>,
    /// Explicit user ids.
    pub user_ids: Vec<UserId>,
    /// Page size for batched modes.
    pub batch_size: u64,
    /// Starting offset for batched modes.
    pub offset: u64,
    /// Page cap for batched modes; 0 means unbounded.
    pub max_batches: u64,
}

impl Default for ResyncConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            active_only: false,
            migrated_source: None,
            subscription_ids: Vec::new(),
            order_ids: Vec::new(),
            user_ids: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            offset: 0,
            max_batches: 0,
        }
    }
}

/// Fatal resync errors. Per-item failures never surface here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResyncError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Commerce(#[from] CommerceError),

    #[error("batch size must be at least 1")]
    InvalidBatchSize,
}

/// Drives bulk contact resync against the commerce readers.
pub struct WooResyncDriver {
    engine: Arc<ContactSyncEngine>,
    customers: Arc<dyn CustomerReader>,
    subscriptions: Arc<dyn SubscriptionReader>,
    orders: Arc<dyn OrderReader>,
}

impl WooResyncDriver {
    pub fn new(
        engine: Arc<ContactSyncEngine>,
        customers: Arc<dyn CustomerReader>,
        subscriptions: Arc<dyn SubscriptionReader>,
        orders: Arc<dyn OrderReader>,
    ) -> Self {
        Self {
            engine,
            customers,
            subscriptions,
            orders,
        }
    }

    /// Runs one resync pass and returns the number of contacts processed.
    pub async fn resync(
        &self,
        ctx: &SyncContext,
        config: &ResyncConfig,
    ) -> Result<u64, ResyncError> {
        if config.batch_size == 0 {
            return Err(ResyncError::InvalidBatchSize);
        }
        // The gate is checked once up front, not per item. Dry-run
        // proceeds regardless: nothing will be sent.
        if !config.dry_run {
            self.engine.can_sync()?;
        }

        if !config.subscription_ids.is_empty() {
            self.resync_subscription_ids(ctx, config, &config.subscription_ids)
                .await
        } else if !config.order_ids.is_empty() {
            self.resync_order_ids(ctx, config).await
        } else if !config.user_ids.is_empty() {
            self.resync_user_ids(ctx, config, &config.user_ids).await
        } else if let Some(source) = config.migrated_source {
            self.resync_migrated(ctx, config, source).await
        } else {
            self.resync_all_customers(ctx, config).await
        }
    }

    async fn resync_subscription_ids(
        &self,
        ctx: &SyncContext,
        config: &ResyncConfig,
        ids: &[SubscriptionId],
    ) -> Result<u64, ResyncError> {
        let mut processed = 0;
        for &id in ids {
            let subscription = match self.subscriptions.get_subscription(id).await {
                Ok(s) => s,
                Err(err) => {
                    tracing::warn!("[{}] skipping subscription {}: {}", ctx.request_id, id, err);
                    continue;
                }
            };
            if config.active_only && !subscription.is_active() {
                tracing::debug!(
                    "[{}] skipping inactive subscription {}",
                    ctx.request_id,
                    id
                );
                continue;
            }
            let customer = match self.customers.get_customer(subscription.customer_id).await {
                Ok(c) => c,
                Err(err) => {
                    tracing::warn!(
                        "[{}] skipping subscription {}: customer lookup failed: {}",
                        ctx.request_id,
                        id,
                        err
                    );
                    continue;
                }
            };
            self.process_contact(ctx, config, customer_contact(&customer), &mut processed)
                .await;
        }
        Ok(processed)
    }

    async fn resync_order_ids(
        &self,
        ctx: &SyncContext,
        config: &ResyncConfig,
    ) -> Result<u64, ResyncError> {
        let mut processed = 0;
        for &id in &config.order_ids {
            let order = match self.orders.get_order(id).await {
                Ok(o) => o,
                Err(err) => {
                    tracing::warn!("[{}] skipping order {}: {}", ctx.request_id, id, err);
                    continue;
                }
            };
            let Some(contact) = order_contact(&order) else {
                tracing::warn!(
                    "[{}] skipping order {}: no billing email",
                    ctx.request_id,
                    id
                );
                continue;
            };
            self.process_contact(ctx, config, contact, &mut processed).await;
        }
        Ok(processed)
    }

    async fn resync_user_ids(
        &self,
        ctx: &SyncContext,
        config: &ResyncConfig,
        ids: &[UserId],
    ) -> Result<u64, ResyncError> {
        let mut processed = 0;
        for &id in ids {
            if config.active_only && !self.user_has_active_subscription(id).await {
                tracing::debug!(
                    "[{}] skipping user {}: no active subscription",
                    ctx.request_id,
                    id
                );
                continue;
            }
            let customer = match self.customers.get_customer(id).await {
                Ok(c) => c,
                Err(err) => {
                    tracing::warn!("[{}] skipping user {}: {}", ctx.request_id, id, err);
                    continue;
                }
            };
            self.process_contact(ctx, config, customer_contact(&customer), &mut processed)
                .await;
        }
        Ok(processed)
    }

    async fn resync_migrated(
        &self,
        ctx: &SyncContext,
        config: &ResyncConfig,
        source: MigrationSource,
    ) -> Result<u64, ResyncError> {
        let mut processed = 0;
        let mut batch = 0;
        loop {
            let offset = config.offset + batch * config.batch_size;
            let ids = self
                .subscriptions
                .migrated_subscription_ids(source, offset, config.batch_size)
                .await?;
            if ids.is_empty() {
                break;
            }
            processed += self.resync_subscription_ids(ctx, config, &ids).await?;
            batch += 1;
            if config.max_batches > 0 && batch >= config.max_batches {
                break;
            }
        }
        Ok(processed)
    }

    async fn resync_all_customers(
        &self,
        ctx: &SyncContext,
        config: &ResyncConfig,
    ) -> Result<u64, ResyncError> {
        let mut processed = 0;
        let mut batch = 0;
        loop {
            let offset = config.offset + batch * config.batch_size;
            let ids = self
                .customers
                .customer_ids_page(offset, config.batch_size)
                .await?;
            if ids.is_empty() {
                break;
            }
            processed += self.resync_user_ids(ctx, config, &ids).await?;
            batch += 1;
            if config.max_batches > 0 && batch >= config.max_batches {
                break;
            }
        }
        Ok(processed)
    }

    async fn user_has_active_subscription(&self, user_id: UserId) -> bool {
        match self.subscriptions.subscriptions_for_user(user_id).await {
            Ok(subs) => subs.iter().any(|s| s.is_active()),
            Err(err) => {
                tracing::warn!("subscription lookup for user {} failed: {}", user_id, err);
                false
            }
        }
    }

    /// Syncs one contact, counting it on success. Dry-run counts without
    /// touching the provider. Per-item failures are logged, not raised.
    async fn process_contact(
        &self,
        ctx: &SyncContext,
        config: &ResyncConfig,
        contact: Contact,
        processed: &mut u64,
    ) {
        if config.dry_run {
            tracing::info!(
                "[{}] dry-run: would sync contact {}",
                ctx.request_id,
                contact.email
            );
            *processed += 1;
            return;
        }
        match self.engine.sync_contact(ctx, &contact).await {
            Ok(_) => {
                tracing::info!("[{}] synced contact {}", ctx.request_id, contact.email);
                *processed += 1;
            }
            Err(err) => {
                tracing::warn!(
                    "[{}] failed to sync contact {}: {}",
                    ctx.request_id,
                    contact.email,
                    err
                );
            }
        }
    }
}

/// Contact payload from a customer record. A missing billing email is
/// backfilled from the account email by `resolved_email`.
fn customer_contact(customer: &Customer) -> Contact {
    let mut contact = Contact::new(customer.resolved_email().clone())
        .with_metadata("registration_source", "woocommerce");
    if let Some(name) = &customer.display_name {
        contact = contact.with_name(name.clone());
    }
    contact
}

/// Contact payload from an order record; `None` when the order carries no
/// billing email.
fn order_contact(order: &Order) -> Option<Contact> {
    let email = order.billing_email.clone()?;
    let mut contact =
        Contact::new(email).with_metadata("registration_source", "woocommerce-order");
    if let Some(name) = &order.billing_name {
        contact = contact.with_name(name.clone());
    }
    Some(contact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryCommerce, InMemoryListRegistry};
    use crate::adapters::providers::{MockCall, MockEspProvider};
    use crate::domain::contact::EmailAddress;
    use crate::domain::lists::NativeListId;
    use crate::domain::membership::MembershipStatus;
    use crate::domain::provider::ProviderKind;
    use crate::ports::Subscription;

    fn email(raw: &str) -> EmailAddress {
        EmailAddress::new(raw).unwrap()
    }

    fn driver_with(
        provider: &Arc<MockEspProvider>,
        commerce: &Arc<InMemoryCommerce>,
        sync_enabled: bool,
    ) -> WooResyncDriver {
        let engine = Arc::new(
            ContactSyncEngine::new(provider.clone(), Arc::new(InMemoryListRegistry::new()))
                .with_audience(NativeListId::new("master"))
                .with_commerce_sync_enabled(sync_enabled),
        );
        WooResyncDriver::new(engine, commerce.clone(), commerce.clone(), commerce.clone())
    }

    fn commerce_with_customers(n: u64) -> InMemoryCommerce {
        let mut commerce = InMemoryCommerce::new();
        for i in 1..=n {
            commerce = commerce.with_customer(
                UserId::new(i),
                email(&format!("reader{}@example.com", i)),
            );
        }
        commerce
    }

    #[tokio::test]
    async fn all_customers_mode_visits_every_customer_exactly_once() {
        let provider = Arc::new(MockEspProvider::new(ProviderKind::Mailchimp));
        let commerce = Arc::new(commerce_with_customers(23));
        let driver = driver_with(&provider, &commerce, true);
        let config = ResyncConfig {
            batch_size: 10,
            max_batches: 0,
            ..ResyncConfig::default()
        };

        let processed = driver.resync(&SyncContext::new(), &config).await.unwrap();

        assert_eq!(processed, 23);
        let adds: Vec<_> = provider
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::AddContact { email, .. } => Some(email),
                _ => None,
            })
            .collect();
        assert_eq!(adds.len(), 23);
        let unique: std::collections::HashSet<_> = adds.iter().collect();
        assert_eq!(unique.len(), 23);
    }

    #[tokio::test]
    async fn max_batches_caps_the_scan() {
        let provider = Arc::new(MockEspProvider::new(ProviderKind::Mailchimp));
        let commerce = Arc::new(commerce_with_customers(30));
        let driver = driver_with(&provider, &commerce, true);
        let config = ResyncConfig {
            batch_size: 10,
            max_batches: 2,
            ..ResyncConfig::default()
        };

        let processed = driver.resync(&SyncContext::new(), &config).await.unwrap();
        assert_eq!(processed, 20);
    }

    #[tokio::test]
    async fn offset_skips_ahead() {
        let provider = Arc::new(MockEspProvider::new(ProviderKind::Mailchimp));
        let commerce = Arc::new(commerce_with_customers(15));
        let driver = driver_with(&provider, &commerce, true);
        let config = ResyncConfig {
            batch_size: 10,
            offset: 10,
            ..ResyncConfig::default()
        };

        let processed = driver.resync(&SyncContext::new(), &config).await.unwrap();
        assert_eq!(processed, 5);
    }

    #[tokio::test]
    async fn dry_run_counts_but_never_mutates() {
        let provider = Arc::new(MockEspProvider::new(ProviderKind::Mailchimp));
        let commerce = Arc::new(commerce_with_customers(8));
        let driver = driver_with(&provider, &commerce, true);
        let config = ResyncConfig {
            dry_run: true,
            ..ResyncConfig::default()
        };

        let processed = driver.resync(&SyncContext::new(), &config).await.unwrap();

        assert_eq!(processed, 8);
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn gate_failure_aborts_before_any_item() {
        let provider = Arc::new(MockEspProvider::new(ProviderKind::Mailchimp));
        let commerce = Arc::new(commerce_with_customers(5));
        let driver = driver_with(&provider, &commerce, false);

        let result = driver
            .resync(&SyncContext::new(), &ResyncConfig::default())
            .await;

        assert_eq!(result, Err(ResyncError::Sync(SyncError::SyncDisabled)));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn dry_run_proceeds_even_when_the_gate_would_fail() {
        let provider = Arc::new(MockEspProvider::new(ProviderKind::Mailchimp));
        let commerce = Arc::new(commerce_with_customers(3));
        let driver = driver_with(&provider, &commerce, false);
        let config = ResyncConfig {
            dry_run: true,
            ..ResyncConfig::default()
        };

        let processed = driver.resync(&SyncContext::new(), &config).await.unwrap();
        assert_eq!(processed, 3);
    }

    #[tokio::test]
    async fn subscription_ids_take_priority_over_user_ids() {
        let provider = Arc::new(MockEspProvider::new(ProviderKind::Mailchimp));
        let commerce = Arc::new(
            commerce_with_customers(2).with_subscription(Subscription {
                id: SubscriptionId::new(100),
                customer_id: UserId::new(1),
                status: MembershipStatus::Active,
                migrated_from: None,
            }),
        );
        let driver = driver_with(&provider, &commerce, true);
        let config = ResyncConfig {
            subscription_ids: vec![SubscriptionId::new(100)],
            user_ids: vec![UserId::new(1), UserId::new(2)],
            ..ResyncConfig::default()
        };

        let processed = driver.resync(&SyncContext::new(), &config).await.unwrap();

        // Only the subscription mode ran.
        assert_eq!(processed, 1);
    }

    #[tokio::test]
    async fn active_only_skips_inactive_subscriptions() {
        let provider = Arc::new(MockEspProvider::new(ProviderKind::Mailchimp));
        let commerce = Arc::new(
            commerce_with_customers(2)
                .with_subscription(Subscription {
                    id: SubscriptionId::new(100),
                    customer_id: UserId::new(1),
                    status: MembershipStatus::Active,
                    migrated_from: None,
                })
                .with_subscription(Subscription {
                    id: SubscriptionId::new(101),
                    customer_id: UserId::new(2),
                    status: MembershipStatus::Expired,
                    migrated_from: None,
                }),
        );
        let driver = driver_with(&provider, &commerce, true);
        let config = ResyncConfig {
            subscription_ids: vec![SubscriptionId::new(100), SubscriptionId::new(101)],
            active_only: true,
            ..ResyncConfig::default()
        };

        let processed = driver.resync(&SyncContext::new(), &config).await.unwrap();
        assert_eq!(processed, 1);
    }

    #[tokio::test]
    async fn active_only_filters_users_without_active_subscriptions() {
        let provider = Arc::new(MockEspProvider::new(ProviderKind::Mailchimp));
        let commerce = Arc::new(
            commerce_with_customers(2).with_subscription(Subscription {
                id: SubscriptionId::new(100),
                customer_id: UserId::new(1),
                status: MembershipStatus::Pending,
                migrated_from: None,
            }),
        );
        let driver = driver_with(&provider, &commerce, true);
        let config = ResyncConfig {
            user_ids: vec![UserId::new(1), UserId::new(2)],
            active_only: true,
            ..ResyncConfig::default()
        };

        // Pending is active-equivalent; user 2 has no subscription at all.
        let processed = driver.resync(&SyncContext::new(), &config).await.unwrap();
        assert_eq!(processed, 1);
    }

    #[tokio::test]
    async fn migrated_mode_pages_through_the_source() {
        let provider = Arc::new(MockEspProvider::new(ProviderKind::Mailchimp));
        let mut commerce = commerce_with_customers(1);
        for i in 0..12 {
            commerce = commerce.with_subscription(Subscription {
                id: SubscriptionId::new(200 + i),
                customer_id: UserId::new(1),
                status: MembershipStatus::Active,
                migrated_from: Some(MigrationSource::Stripe),
            });
        }
        let commerce = Arc::new(commerce);
        let driver = driver_with(&provider, &commerce, true);
        let config = ResyncConfig {
            migrated_source: Some(MigrationSource::Stripe),
            batch_size: 5,
            ..ResyncConfig::default()
        };

        let processed = driver.resync(&SyncContext::new(), &config).await.unwrap();
        assert_eq!(processed, 12);
    }

    #[tokio::test]
    async fn order_without_billing_email_is_skipped() {
        let provider = Arc::new(MockEspProvider::new(ProviderKind::Mailchimp));
        let commerce = Arc::new(
            InMemoryCommerce::new()
                .with_order(Order {
                    id: OrderId::new(1),
                    customer_id: None,
                    billing_email: Some(email("buyer@example.com")),
                    billing_name: Some("A Buyer".to_string()),
                })
                .with_order(Order {
                    id: OrderId::new(2),
                    customer_id: None,
                    billing_email: None,
                    billing_name: None,
                }),
        );
        let driver = driver_with(&provider, &commerce, true);
        let config = ResyncConfig {
            order_ids: vec![OrderId::new(1), OrderId::new(2)],
            ..ResyncConfig::default()
        };

        let processed = driver.resync(&SyncContext::new(), &config).await.unwrap();
        assert_eq!(processed, 1);
    }

    #[tokio::test]
    async fn missing_items_are_skipped_not_fatal() {
        let provider = Arc::new(MockEspProvider::new(ProviderKind::Mailchimp));
        let commerce = Arc::new(commerce_with_customers(1));
        let driver = driver_with(&provider, &commerce, true);
        let config = ResyncConfig {
            user_ids: vec![UserId::new(1), UserId::new(404)],
            ..ResyncConfig::default()
        };

        let processed = driver.resync(&SyncContext::new(), &config).await.unwrap();
        assert_eq!(processed, 1);
    }

    #[tokio::test]
    async fn zero_batch_size_is_rejected() {
        let provider = Arc::new(MockEspProvider::new(ProviderKind::Mailchimp));
        let commerce = Arc::new(commerce_with_customers(1));
        let driver = driver_with(&provider, &commerce, true);
        let config = ResyncConfig {
            batch_size: 0,
            ..ResyncConfig::default()
        };

        assert_eq!(
            driver.resync(&SyncContext::new(), &config).await,
            Err(ResyncError::InvalidBatchSize)
        );
    }
}
