//! Commerce Ports - read access to WooCommerce customers, subscriptions,
//! orders, and membership plans.
//!
//! The membership bridge and the bulk resync driver are the consumers.
//! Everything here is read-only: the sync core never mutates commerce
//! state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::contact::EmailAddress;
use crate::domain::foundation::{OrderId, PlanId, SubscriptionId, UserId, ValidationError};
use crate::domain::lists::FormId;
use crate::domain::membership::{MembershipPlan, MembershipStatus};

/// A commerce customer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: UserId,
    /// Billing email from the most recent order, when present.
    pub billing_email: Option<EmailAddress>,
    /// The account email; always present for a registered customer.
    pub account_email: EmailAddress,
    pub display_name: Option<String>,
}

impl Customer {
    /// The address to sync: billing email, backfilled from the account
    /// email when absent.
    pub fn resolved_email(&self) -> &EmailAddress {
        self.billing_email.as_ref().unwrap_or(&self.account_email)
    }
}

/// A commerce subscription record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub customer_id: UserId,
    pub status: MembershipStatus,
    /// Where this subscription was migrated from, if anywhere.
    pub migrated_from: Option<MigrationSource>,
}

impl Subscription {
    /// True when the subscription grants active access.
    pub fn is_active(&self) -> bool {
        self.status.grants_access()
    }
}

/// A commerce order record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: Option<UserId>,
    pub billing_email: Option<EmailAddress>,
    pub billing_name: Option<String>,
}

/// The closed set of subscription migration sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationSource {
    Stripe,
    Piano,
    Csv,
}

impl MigrationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationSource::Stripe => "stripe",
            MigrationSource::Piano => "piano",
            MigrationSource::Csv => "csv",
        }
    }
}

impl fmt::Display for MigrationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MigrationSource {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stripe" => Ok(MigrationSource::Stripe),
            "piano" => Ok(MigrationSource::Piano),
            "csv" => Ok(MigrationSource::Csv),
            other => Err(ValidationError::invalid_format(
                "migration_source",
                format!("unknown source '{}'", other),
            )),
        }
    }
}

/// Read access to customer records.
#[async_trait]
pub trait CustomerReader: Send + Sync {
    /// One page of customer ids, ordered stably. An empty page means the
    /// source is exhausted.
    async fn customer_ids_page(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<UserId>, CommerceError>;

    async fn get_customer(&self, id: UserId) -> Result<Customer, CommerceError>;
}

/// Read access to subscription records.
#[async_trait]
pub trait SubscriptionReader: Send + Sync {
    async fn get_subscription(&self, id: SubscriptionId) -> Result<Subscription, CommerceError>;

    async fn subscriptions_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Subscription>, CommerceError>;

    /// One page of subscription ids migrated from the given source.
    async fn migrated_subscription_ids(
        &self,
        source: MigrationSource,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<SubscriptionId>, CommerceError>;
}

/// Read access to order records.
#[async_trait]
pub trait OrderReader: Send + Sync {
    async fn get_order(&self, id: OrderId) -> Result<Order, CommerceError>;
}

/// Read access to membership plans and their list restrictions.
#[async_trait]
pub trait MembershipPlanReader: Send + Sync {
    async fn get_plan(&self, id: PlanId) -> Result<MembershipPlan, CommerceError>;

    /// The plans whose content-restriction rules reference the given
    /// local list. Empty means the list is ungated.
    async fn plans_restricting(&self, form_id: FormId) -> Result<Vec<PlanId>, CommerceError>;
}

/// Commerce read errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommerceError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("commerce storage error: {0}")]
    Storage(String),
}

impl CommerceError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CommerceError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        CommerceError::Storage(message.into())
    }
}
