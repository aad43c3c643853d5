//! WooCommerce REST client.
//!
//! Implements the commerce read ports over the WooCommerce REST API with
//! consumer key/secret basic auth. This is the production counterpart of
//! the in-memory commerce fixtures.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use crate::domain::contact::EmailAddress;
use crate::domain::foundation::{OrderId, PlanId, SubscriptionId, UserId};
use crate::domain::lists::FormId;
use crate::domain::membership::{MembershipPlan, MembershipStatus};
use crate::ports::{
    AccessCheckError, CommerceError, ContentAccessChecker, Customer, CustomerReader,
    MembershipPlanReader, MigrationSource, Order, OrderReader, Subscription, SubscriptionReader,
};

/// Connection settings for a WooCommerce site.
#[derive(Debug, Clone)]
pub struct WooClientConfig {
    /// Site base URL, e.g. `https://news.example.com`.
    pub base_url: String,
    pub consumer_key: String,
    consumer_secret: Secret<String>,
    pub timeout: Duration,
}

impl WooClientConfig {
    pub fn new(
        base_url: impl Into<String>,
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            consumer_key: consumer_key.into(),
            consumer_secret: Secret::new(consumer_secret.into()),
            timeout: Duration::from_secs(30),
        }
    }

    fn consumer_secret(&self) -> &str {
        self.consumer_secret.expose_secret()
    }
}

/// WooCommerce REST API client implementing the commerce read ports.
pub struct WooCommerceClient {
    config: WooClientConfig,
    client: Client,
}

impl WooCommerceClient {
    pub fn new(config: WooClientConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self { config, client }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, CommerceError> {
        let url = format!("{}/wp-json/wc/v3/{}", self.config.base_url, path);
        let response = self
            .client
            .get(url)
            .basic_auth(&self.config.consumer_key, Some(self.config.consumer_secret()))
            .query(query)
            .send()
            .await
            .map_err(|e| CommerceError::storage(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CommerceError::not_found("resource", path));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CommerceError::storage(format!("{}: {}", status, body)));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| CommerceError::storage(e.to_string()))
    }

    fn parse_status(raw: &str) -> Result<MembershipStatus, CommerceError> {
        raw.parse()
            .map_err(|_| CommerceError::storage(format!("unknown status '{}'", raw)))
    }
}

#[async_trait]
impl CustomerReader for WooCommerceClient {
    async fn customer_ids_page(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<UserId>, CommerceError> {
        let customers: Vec<WooCustomer> = self
            .get_json(
                "customers",
                &[
                    ("offset", offset.to_string()),
                    ("per_page", limit.to_string()),
                    ("orderby", "id".to_string()),
                    ("order", "asc".to_string()),
                    ("role", "all".to_string()),
                ],
            )
            .await?;
        Ok(customers.into_iter().map(|c| UserId::new(c.id)).collect())
    }

    async fn get_customer(&self, id: UserId) -> Result<Customer, CommerceError> {
        let customer: WooCustomer = self.get_json(&format!("customers/{}", id), &[]).await?;
        customer.try_into()
    }
}

#[async_trait]
impl SubscriptionReader for WooCommerceClient {
    async fn get_subscription(&self, id: SubscriptionId) -> Result<Subscription, CommerceError> {
        let subscription: WooSubscription =
            self.get_json(&format!("subscriptions/{}", id), &[]).await?;
        subscription.try_into()
    }

    async fn subscriptions_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Subscription>, CommerceError> {
        let subscriptions: Vec<WooSubscription> = self
            .get_json(
                "subscriptions",
                &[("customer", user_id.to_string()), ("per_page", "100".to_string())],
            )
            .await?;
        subscriptions.into_iter().map(Subscription::try_from).collect()
    }

    async fn migrated_subscription_ids(
        &self,
        source: MigrationSource,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<SubscriptionId>, CommerceError> {
        let subscriptions: Vec<WooSubscription> = self
            .get_json(
                "subscriptions",
                &[
                    ("migrated_from", source.to_string()),
                    ("offset", offset.to_string()),
                    ("per_page", limit.to_string()),
                    ("orderby", "id".to_string()),
                    ("order", "asc".to_string()),
                ],
            )
            .await?;
        Ok(subscriptions
            .into_iter()
            .map(|s| SubscriptionId::new(s.id))
            .collect())
    }
}

#[async_trait]
impl OrderReader for WooCommerceClient {
    async fn get_order(&self, id: OrderId) -> Result<Order, CommerceError> {
        let order: WooOrder = self.get_json(&format!("orders/{}", id), &[]).await?;
        Ok(order.into())
    }
}

#[async_trait]
impl MembershipPlanReader for WooCommerceClient {
    async fn get_plan(&self, id: PlanId) -> Result<MembershipPlan, CommerceError> {
        let plan: WooPlan = self
            .get_json(&format!("memberships/plans/{}", id), &[])
            .await?;
        Ok(plan.into())
    }

    async fn plans_restricting(&self, form_id: FormId) -> Result<Vec<PlanId>, CommerceError> {
        let plans: Vec<WooPlan> = self
            .get_json("memberships/plans", &[("per_page", "100".to_string())])
            .await?;
        Ok(plans
            .into_iter()
            .map(MembershipPlan::from)
            .filter(|plan| plan.restricts(form_id))
            .map(|plan| plan.id)
            .collect())
    }
}

#[async_trait]
impl ContentAccessChecker for WooCommerceClient {
    async fn can_view(&self, user_id: UserId, plan_id: PlanId) -> Result<bool, AccessCheckError> {
        let members: Vec<WooMember> = self
            .get_json(
                "memberships/members",
                &[
                    ("customer", user_id.to_string()),
                    ("plan", plan_id.to_string()),
                ],
            )
            .await
            .map_err(|e| AccessCheckError::new(e.to_string()))?;
        Ok(members.iter().any(|m| {
            m.status
                .parse::<MembershipStatus>()
                .map(|s| s.grants_access())
                .unwrap_or(false)
        }))
    }
}

// Wire types.

#[derive(Debug, Deserialize)]
struct WooCustomer {
    id: u64,
    #[serde(default)]
    email: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    billing: WooBilling,
}

#[derive(Debug, Default, Deserialize)]
struct WooBilling {
    #[serde(default)]
    email: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

impl TryFrom<WooCustomer> for Customer {
    type Error = CommerceError;

    fn try_from(customer: WooCustomer) -> Result<Self, Self::Error> {
        let account_email = EmailAddress::new(&customer.email).map_err(|e| {
            CommerceError::storage(format!("customer {}: {}", customer.id, e))
        })?;
        let billing_email = EmailAddress::new(&customer.billing.email).ok();
        let display_name = join_name(&customer.first_name, &customer.last_name);
        Ok(Customer {
            id: UserId::new(customer.id),
            billing_email,
            account_email,
            display_name,
        })
    }
}

#[derive(Debug, Deserialize)]
struct WooSubscription {
    id: u64,
    customer_id: u64,
    status: String,
    #[serde(default)]
    meta_data: Vec<WooMeta>,
}

#[derive(Debug, Deserialize)]
struct WooMeta {
    key: String,
    value: serde_json::Value,
}

impl TryFrom<WooSubscription> for Subscription {
    type Error = CommerceError;

    fn try_from(subscription: WooSubscription) -> Result<Self, Self::Error> {
        let migrated_from = subscription
            .meta_data
            .iter()
            .find(|m| m.key == "_migrated_from")
            .and_then(|m| m.value.as_str())
            .and_then(|v| v.parse().ok());
        Ok(Subscription {
            id: SubscriptionId::new(subscription.id),
            customer_id: UserId::new(subscription.customer_id),
            status: WooCommerceClient::parse_status(&subscription.status)?,
            migrated_from,
        })
    }
}

#[derive(Debug, Deserialize)]
struct WooOrder {
    id: u64,
    #[serde(default)]
    customer_id: u64,
    #[serde(default)]
    billing: WooBilling,
}

impl From<WooOrder> for Order {
    fn from(order: WooOrder) -> Self {
        Order {
            id: OrderId::new(order.id),
            customer_id: (order.customer_id != 0).then(|| UserId::new(order.customer_id)),
            billing_email: EmailAddress::new(&order.billing.email).ok(),
            billing_name: join_name(&order.billing.first_name, &order.billing.last_name),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WooPlan {
    id: u64,
    name: String,
    #[serde(default)]
    content_restriction_rules: Vec<WooRestrictionRule>,
}

#[derive(Debug, Deserialize)]
struct WooRestrictionRule {
    #[serde(default)]
    content_type: String,
    #[serde(default)]
    content_ids: Vec<u64>,
}

impl From<WooPlan> for MembershipPlan {
    fn from(plan: WooPlan) -> Self {
        // Only rules gating the subscription-list content type matter to
        // list sync.
        let restricted_lists = plan
            .content_restriction_rules
            .iter()
            .filter(|rule| rule.content_type == "subscription_list")
            .flat_map(|rule| rule.content_ids.iter().copied().map(FormId::new))
            .collect();
        MembershipPlan {
            id: PlanId::new(plan.id),
            name: plan.name,
            restricted_lists,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WooMember {
    #[serde(default)]
    status: String,
}

fn join_name(first: &str, last: &str) -> Option<String> {
    match (first.is_empty(), last.is_empty()) {
        (false, false) => Some(format!("{} {}", first, last)),
        (false, true) => Some(first.to_string()),
        (true, false) => Some(last.to_string()),
        (true, true) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_scans_only_subscription_list_rules() {
        let plan = WooPlan {
            id: 5,
            name: "Supporters".into(),
            content_restriction_rules: vec![
                WooRestrictionRule {
                    content_type: "subscription_list".into(),
                    content_ids: vec![41, 42],
                },
                WooRestrictionRule {
                    content_type: "post".into(),
                    content_ids: vec![9],
                },
            ],
        };
        let plan = MembershipPlan::from(plan);
        assert_eq!(plan.restricted_lists, vec![FormId::new(41), FormId::new(42)]);
    }

    #[test]
    fn customer_backfill_uses_account_email() {
        let customer = WooCustomer {
            id: 7,
            email: "account@example.com".into(),
            first_name: "Ada".into(),
            last_name: String::new(),
            billing: WooBilling::default(),
        };
        let customer = Customer::try_from(customer).unwrap();
        assert!(customer.billing_email.is_none());
        assert_eq!(customer.resolved_email().as_str(), "account@example.com");
        assert_eq!(customer.display_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn migrated_source_is_read_from_meta() {
        let subscription = WooSubscription {
            id: 1,
            customer_id: 2,
            status: "active".into(),
            meta_data: vec![WooMeta {
                key: "_migrated_from".into(),
                value: serde_json::json!("stripe"),
            }],
        };
        let subscription = Subscription::try_from(subscription).unwrap();
        assert_eq!(subscription.migrated_from, Some(MigrationSource::Stripe));
    }

    #[test]
    fn guest_order_has_no_customer_id() {
        let order = WooOrder {
            id: 3,
            customer_id: 0,
            billing: WooBilling {
                email: "guest@example.com".into(),
                first_name: String::new(),
                last_name: String::new(),
            },
        };
        let order = Order::from(order);
        assert!(order.customer_id.is_none());
        assert_eq!(
            order.billing_email.as_ref().map(|e| e.as_str()),
            Some("guest@example.com")
        );
    }
}
