//! Local List Registry Port - lookup of site-owned subscription lists.

use async_trait::async_trait;

use crate::domain::lists::{FormId, SubscriptionList};
use crate::domain::provider::ProviderKind;

/// Read-only access to the site's subscription list definitions.
///
/// The sole path from a local form id to its full definition. Lists are
/// created and edited elsewhere; the sync core only reads them.
#[async_trait]
pub trait ListRegistry: Send + Sync {
    /// Resolves a local form id to its definition.
    ///
    /// Fails explicitly with [`RegistryError::ListNotFound`], never a
    /// silent `None`, so callers can distinguish a broken local
    /// reference from a provider-native id. Callers are expected to have
    /// already established the id is local via [`crate::domain::lists::ListTarget`].
    async fn resolve(&self, form_id: FormId) -> Result<SubscriptionList, RegistryError>;

    /// All local lists with a complete settings entry for the provider.
    ///
    /// Used when reverse-mapping a contact's provider-side tags back to
    /// local list identifiers.
    async fn configured_for_provider(
        &self,
        provider: ProviderKind,
    ) -> Result<Vec<SubscriptionList>, RegistryError>;

    /// Every local list, configured or not.
    async fn all(&self) -> Result<Vec<SubscriptionList>, RegistryError>;
}

/// Registry lookup errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The form id does not correspond to a known local list.
    #[error("subscription list '{form_id}' not found")]
    ListNotFound { form_id: FormId },

    /// The backing store failed.
    #[error("list registry storage error: {0}")]
    Storage(String),
}

impl RegistryError {
    pub fn not_found(form_id: FormId) -> Self {
        RegistryError::ListNotFound { form_id }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        RegistryError::Storage(message.into())
    }
}
