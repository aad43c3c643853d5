//! Subscription lists and list identifiers.

mod list;
mod target;

pub use list::{ProviderListSettings, SubscriptionList};
pub use target::{FormId, ListTarget, NativeListId, TagId};
