//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the sync core and the outside world. Adapters implement these ports.
//!
//! ## Provider Ports
//!
//! - `EspProvider` - the contract every ESP integration implements
//!
//! ## Content-Management Ports
//!
//! - `ListRegistry` - local subscription list lookup
//! - `SnapshotStore` - per-reader deactivation snapshots
//! - `NewsletterStore` - send markers, error logs, test-email prefs
//!
//! ## Commerce Ports
//!
//! - `CustomerReader` / `SubscriptionReader` / `OrderReader` - read access
//!   to WooCommerce records
//! - `MembershipPlanReader` - plan definitions and list restrictions
//! - `ContentAccessChecker` - the commerce plugin's view-access check

mod access_checker;
mod commerce;
mod esp_provider;
mod list_registry;
mod newsletter_store;
mod snapshot_store;

pub use access_checker::{AccessCheckError, ContentAccessChecker};
pub use commerce::{
    CommerceError, Customer, CustomerReader, MembershipPlanReader, MigrationSource, Order,
    OrderReader, Subscription, SubscriptionReader,
};
pub use esp_provider::{
    ApiCredentials, EspContact, EspError, EspProvider, ProviderList, ProviderSegment, SendRequest,
};
pub use list_registry::{ListRegistry, RegistryError};
pub use newsletter_store::{NewsletterStore, NewsletterStoreError};
pub use snapshot_store::{SnapshotStore, SnapshotStoreError};
