//! Provider registry.
//!
//! Builds the sealed set of provider adapters and resolves the
//! configured active one. The resolved provider is injected into the
//! engine, bridge, driver, and gate at construction; nothing looks a
//! provider up ambiently after that.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::provider::ProviderKind;
use crate::ports::{ApiCredentials, EspError, EspProvider};

use super::active_campaign::ActiveCampaignProvider;
use super::campaign_monitor::CampaignMonitorProvider;
use super::constant_contact::ConstantContactProvider;
use super::letterhead::LetterheadProvider;
use super::mailchimp::MailchimpProvider;
use super::manual::ManualProvider;

/// Holds one instance of every provider adapter.
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn EspProvider>>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    /// Builds the full provider set, none of them credentialed yet.
    pub fn new() -> Self {
        let mut providers: HashMap<ProviderKind, Arc<dyn EspProvider>> = HashMap::new();
        providers.insert(
            ProviderKind::Mailchimp,
            Arc::new(MailchimpProvider::new()),
        );
        providers.insert(
            ProviderKind::ActiveCampaign,
            Arc::new(ActiveCampaignProvider::new()),
        );
        providers.insert(
            ProviderKind::CampaignMonitor,
            Arc::new(CampaignMonitorProvider::new()),
        );
        providers.insert(
            ProviderKind::ConstantContact,
            Arc::new(ConstantContactProvider::new()),
        );
        providers.insert(ProviderKind::Manual, Arc::new(ManualProvider::new()));
        providers.insert(
            ProviderKind::Letterhead,
            Arc::new(LetterheadProvider::new()),
        );
        Self { providers }
    }

    /// Stores credentials on one provider, validating their shape.
    pub fn with_credentials(
        self,
        kind: ProviderKind,
        credentials: ApiCredentials,
    ) -> Result<Self, EspError> {
        self.get(kind).set_api_credentials(credentials)?;
        Ok(self)
    }

    /// Resolves a provider by kind. The set is closed, so every kind
    /// resolves.
    pub fn get(&self, kind: ProviderKind) -> Arc<dyn EspProvider> {
        Arc::clone(
            self.providers
                .get(&kind)
                .unwrap_or_else(|| unreachable!("provider set is exhaustive")),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_resolves_to_its_adapter() {
        let registry = ProviderRegistry::new();
        for kind in ProviderKind::all() {
            assert_eq!(registry.get(kind).kind(), kind);
        }
    }

    #[test]
    fn credentials_flow_through_to_the_adapter() {
        let registry = ProviderRegistry::new()
            .with_credentials(
                ProviderKind::Mailchimp,
                ApiCredentials::new().with_field("api_key", "0123abcd-us5"),
            )
            .unwrap();
        assert!(registry.get(ProviderKind::Mailchimp).has_api_credentials());
        assert!(!registry
            .get(ProviderKind::ActiveCampaign)
            .has_api_credentials());
    }

    #[test]
    fn invalid_credentials_are_rejected_at_registration() {
        let result = ProviderRegistry::new().with_credentials(
            ProviderKind::CampaignMonitor,
            ApiCredentials::new().with_field("api_key", "k"),
        );
        assert!(matches!(
            result,
            Err(EspError::InvalidCredentials { .. })
        ));
    }
}
