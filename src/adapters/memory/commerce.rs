//! In-memory commerce fixtures.
//!
//! One struct implements every commerce read port plus the access
//! checker, mirroring how the WooCommerce REST adapter exposes them all
//! from one client.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

use crate::domain::contact::EmailAddress;
use crate::domain::foundation::{OrderId, PlanId, SubscriptionId, UserId};
use crate::domain::lists::FormId;
use crate::domain::membership::MembershipPlan;
use crate::ports::{
    AccessCheckError, CommerceError, ContentAccessChecker, Customer, CustomerReader,
    MembershipPlanReader, MigrationSource, Order, OrderReader, Subscription, SubscriptionReader,
};

#[derive(Default)]
struct State {
    customers: BTreeMap<UserId, Customer>,
    subscriptions: BTreeMap<SubscriptionId, Subscription>,
    orders: BTreeMap<OrderId, Order>,
    plans: BTreeMap<PlanId, MembershipPlan>,
    access: HashSet<(UserId, PlanId)>,
}

/// In-memory commerce store for development and tests.
#[derive(Default)]
pub struct InMemoryCommerce {
    state: RwLock<State>,
}

impl InMemoryCommerce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a customer whose account email is `email`.
    pub fn with_customer(self, id: UserId, email: EmailAddress) -> Self {
        self.state.write().unwrap().customers.insert(
            id,
            Customer {
                id,
                billing_email: None,
                account_email: email,
                display_name: None,
            },
        );
        self
    }

    /// Seeds a full customer record.
    pub fn with_customer_record(self, customer: Customer) -> Self {
        self.state
            .write()
            .unwrap()
            .customers
            .insert(customer.id, customer);
        self
    }

    pub fn with_subscription(self, subscription: Subscription) -> Self {
        self.state
            .write()
            .unwrap()
            .subscriptions
            .insert(subscription.id, subscription);
        self
    }

    pub fn with_order(self, order: Order) -> Self {
        self.state.write().unwrap().orders.insert(order.id, order);
        self
    }

    pub fn with_plan(self, plan: MembershipPlan) -> Self {
        self.state.write().unwrap().plans.insert(plan.id, plan);
        self
    }

    /// Grants `user_id` view access to content gated by `plan_id`.
    pub fn with_access(self, user_id: UserId, plan_id: PlanId) -> Self {
        self.state.write().unwrap().access.insert((user_id, plan_id));
        self
    }
}

#[async_trait]
impl CustomerReader for InMemoryCommerce {
    async fn customer_ids_page(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<UserId>, CommerceError> {
        Ok(self
            .state
            .read()
            .unwrap()
            .customers
            .keys()
            .skip(offset as usize)
            .take(limit as usize)
            .copied()
            .collect())
    }

    async fn get_customer(&self, id: UserId) -> Result<Customer, CommerceError> {
        self.state
            .read()
            .unwrap()
            .customers
            .get(&id)
            .cloned()
            .ok_or_else(|| CommerceError::not_found("customer", id))
    }
}

#[async_trait]
impl SubscriptionReader for InMemoryCommerce {
    async fn get_subscription(&self, id: SubscriptionId) -> Result<Subscription, CommerceError> {
        self.state
            .read()
            .unwrap()
            .subscriptions
            .get(&id)
            .cloned()
            .ok_or_else(|| CommerceError::not_found("subscription", id))
    }

    async fn subscriptions_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Subscription>, CommerceError> {
        Ok(self
            .state
            .read()
            .unwrap()
            .subscriptions
            .values()
            .filter(|s| s.customer_id == user_id)
            .cloned()
            .collect())
    }

    async fn migrated_subscription_ids(
        &self,
        source: MigrationSource,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<SubscriptionId>, CommerceError> {
        Ok(self
            .state
            .read()
            .unwrap()
            .subscriptions
            .values()
            .filter(|s| s.migrated_from == Some(source))
            .map(|s| s.id)
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}

#[async_trait]
impl OrderReader for InMemoryCommerce {
    async fn get_order(&self, id: OrderId) -> Result<Order, CommerceError> {
        self.state
            .read()
            .unwrap()
            .orders
            .get(&id)
            .cloned()
            .ok_or_else(|| CommerceError::not_found("order", id))
    }
}

#[async_trait]
impl MembershipPlanReader for InMemoryCommerce {
    async fn get_plan(&self, id: PlanId) -> Result<MembershipPlan, CommerceError> {
        self.state
            .read()
            .unwrap()
            .plans
            .get(&id)
            .cloned()
            .ok_or_else(|| CommerceError::not_found("membership plan", id))
    }

    async fn plans_restricting(&self, form_id: FormId) -> Result<Vec<PlanId>, CommerceError> {
        Ok(self
            .state
            .read()
            .unwrap()
            .plans
            .values()
            .filter(|plan| plan.restricts(form_id))
            .map(|plan| plan.id)
            .collect())
    }
}

#[async_trait]
impl ContentAccessChecker for InMemoryCommerce {
    async fn can_view(&self, user_id: UserId, plan_id: PlanId) -> Result<bool, AccessCheckError> {
        Ok(self
            .state
            .read()
            .unwrap()
            .access
            .contains(&(user_id, plan_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn customer_pages_are_stable_and_exhaustive() {
        let mut commerce = InMemoryCommerce::new();
        for i in 1..=25u64 {
            commerce = commerce.with_customer(
                UserId::new(i),
                EmailAddress::new(format!("r{}@example.com", i)).unwrap(),
            );
        }

        let mut seen = Vec::new();
        let mut offset = 0;
        loop {
            let page = commerce.customer_ids_page(offset, 10).await.unwrap();
            if page.is_empty() {
                break;
            }
            offset += page.len() as u64;
            seen.extend(page);
        }
        assert_eq!(seen.len(), 25);
    }

    #[tokio::test]
    async fn unknown_records_report_not_found() {
        let commerce = InMemoryCommerce::new();
        assert!(matches!(
            commerce.get_customer(UserId::new(404)).await,
            Err(CommerceError::NotFound { .. })
        ));
        assert!(matches!(
            commerce.get_plan(PlanId::new(404)).await,
            Err(CommerceError::NotFound { .. })
        ));
    }
}
