//! Site-owned subscription list definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::provider::ProviderKind;

use super::target::{FormId, NativeListId, TagId};

/// Per-provider wiring for a local list.
///
/// `list` is the provider audience the list's members live on; `tag_id`
/// is the provider-side marker that emulates the local list's membership
/// when the provider has no native overlapping-list concept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderListSettings {
    pub list: NativeListId,
    pub tag_id: TagId,
}

impl ProviderListSettings {
    pub fn new(list: NativeListId, tag_id: TagId) -> Self {
        Self { list, tag_id }
    }

    /// A settings entry counts as configured only when both halves are set.
    pub fn is_complete(&self) -> bool {
        !self.list.as_str().is_empty() && !self.tag_id.as_str().is_empty()
    }
}

/// A subscription list defined and owned by this site.
///
/// Created and edited through the site's content-management UI; read-only
/// from the sync core's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionList {
    pub form_id: FormId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Provider wiring, keyed by provider.
    #[serde(default)]
    pub settings: HashMap<ProviderKind, ProviderListSettings>,
}

impl SubscriptionList {
    pub fn new(form_id: FormId, title: impl Into<String>) -> Self {
        Self {
            form_id,
            title: title.into(),
            description: String::new(),
            settings: HashMap::new(),
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Wires the list up for a provider.
    pub fn with_provider_settings(
        mut self,
        provider: ProviderKind,
        settings: ProviderListSettings,
    ) -> Self {
        self.settings.insert(provider, settings);
        self
    }

    /// True iff this list has a complete settings entry for the provider.
    pub fn is_configured_for(&self, provider: ProviderKind) -> bool {
        self.settings
            .get(&provider)
            .map(ProviderListSettings::is_complete)
            .unwrap_or(false)
    }

    /// The provider wiring, when configured.
    pub fn provider_settings(&self, provider: ProviderKind) -> Option<&ProviderListSettings> {
        self.settings
            .get(&provider)
            .filter(|s| s.is_complete())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_configured_for_mailchimp() -> SubscriptionList {
        SubscriptionList::new(FormId::new(42), "Weekly Digest").with_provider_settings(
            ProviderKind::Mailchimp,
            ProviderListSettings::new(NativeListId::new("L2"), TagId::new("T2")),
        )
    }

    #[test]
    fn configured_provider_is_reported() {
        let list = list_configured_for_mailchimp();
        assert!(list.is_configured_for(ProviderKind::Mailchimp));
        assert!(!list.is_configured_for(ProviderKind::ActiveCampaign));
    }

    #[test]
    fn incomplete_settings_do_not_count_as_configured() {
        let list = SubscriptionList::new(FormId::new(7), "Breaking News").with_provider_settings(
            ProviderKind::Mailchimp,
            ProviderListSettings::new(NativeListId::new("L1"), TagId::new("")),
        );
        assert!(!list.is_configured_for(ProviderKind::Mailchimp));
        assert!(list.provider_settings(ProviderKind::Mailchimp).is_none());
    }

    #[test]
    fn provider_settings_returns_wiring() {
        let list = list_configured_for_mailchimp();
        let settings = list.provider_settings(ProviderKind::Mailchimp).unwrap();
        assert_eq!(settings.list, NativeListId::new("L2"));
        assert_eq!(settings.tag_id, TagId::new("T2"));
    }
}
