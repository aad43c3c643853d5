//! In-memory list registry.
//!
//! Development and test double for the content-management layer's list
//! storage.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::domain::lists::{FormId, SubscriptionList};
use crate::domain::provider::ProviderKind;
use crate::ports::{ListRegistry, RegistryError};

/// In-memory implementation of the `ListRegistry` port.
#[derive(Default)]
pub struct InMemoryListRegistry {
    lists: RwLock<BTreeMap<FormId, SubscriptionList>>,
}

impl InMemoryListRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a list definition.
    pub fn with_list(self, list: SubscriptionList) -> Self {
        self.lists.write().unwrap().insert(list.form_id, list);
        self
    }
}

#[async_trait]
impl ListRegistry for InMemoryListRegistry {
    async fn resolve(&self, form_id: FormId) -> Result<SubscriptionList, RegistryError> {
        self.lists
            .read()
            .unwrap()
            .get(&form_id)
            .cloned()
            .ok_or(RegistryError::ListNotFound { form_id })
    }

    async fn configured_for_provider(
        &self,
        provider: ProviderKind,
    ) -> Result<Vec<SubscriptionList>, RegistryError> {
        Ok(self
            .lists
            .read()
            .unwrap()
            .values()
            .filter(|list| list.is_configured_for(provider))
            .cloned()
            .collect())
    }

    async fn all(&self) -> Result<Vec<SubscriptionList>, RegistryError> {
        Ok(self.lists.read().unwrap().values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lists::{NativeListId, ProviderListSettings, TagId};

    #[tokio::test]
    async fn resolve_fails_explicitly_for_unknown_ids() {
        let registry = InMemoryListRegistry::new();
        let result = registry.resolve(FormId::new(404)).await;
        assert_eq!(
            result,
            Err(RegistryError::ListNotFound {
                form_id: FormId::new(404)
            })
        );
    }

    #[tokio::test]
    async fn configured_for_provider_filters_by_completeness() {
        let registry = InMemoryListRegistry::new()
            .with_list(
                SubscriptionList::new(FormId::new(1), "Wired").with_provider_settings(
                    ProviderKind::Mailchimp,
                    ProviderListSettings::new(NativeListId::new("L"), TagId::new("T")),
                ),
            )
            .with_list(SubscriptionList::new(FormId::new(2), "Unwired"));

        let configured = registry
            .configured_for_provider(ProviderKind::Mailchimp)
            .await
            .unwrap();
        assert_eq!(configured.len(), 1);
        assert_eq!(configured[0].form_id, FormId::new(1));
    }
}
