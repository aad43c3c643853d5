//! Manual provider.
//!
//! For sites that copy rendered newsletter HTML into an external tool by
//! hand. Lists, contacts, and delivery are inherently unmanaged, so the
//! correct behavior for every operation is a deliberate no-op success,
//! not a "not implemented" error.

use async_trait::async_trait;

use crate::domain::contact::{Contact, EmailAddress};
use crate::domain::lists::NativeListId;
use crate::domain::provider::ProviderKind;
use crate::ports::{
    ApiCredentials, EspContact, EspError, EspProvider, ProviderList, SendRequest,
};

/// The no-op provider.
#[derive(Debug, Default)]
pub struct ManualProvider;

impl ManualProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EspProvider for ManualProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Manual
    }

    fn has_api_credentials(&self) -> bool {
        // There is no API; nothing is ever missing.
        true
    }

    fn set_api_credentials(&self, _credentials: ApiCredentials) -> Result<(), EspError> {
        Ok(())
    }

    async fn get_lists(&self) -> Result<Vec<ProviderList>, EspError> {
        Ok(Vec::new())
    }

    async fn get_contact(&self, _email: &EmailAddress) -> Result<Option<EspContact>, EspError> {
        Ok(None)
    }

    async fn add_contact(
        &self,
        contact: &Contact,
        _list: &NativeListId,
    ) -> Result<EspContact, EspError> {
        Ok(EspContact {
            email: contact.email.clone(),
            name: contact.name.clone(),
            metadata: contact.metadata.clone(),
        })
    }

    async fn update_contact_lists(
        &self,
        _email: &EmailAddress,
        _to_add: &[NativeListId],
        _to_remove: &[NativeListId],
    ) -> Result<(), EspError> {
        Ok(())
    }

    async fn contact_lists(&self, _email: &EmailAddress) -> Result<Vec<NativeListId>, EspError> {
        Ok(Vec::new())
    }

    async fn send(&self, request: &SendRequest) -> Result<(), EspError> {
        // The user delivers the HTML themselves; "sending" only means the
        // newsletter may now be marked sent.
        tracing::info!(
            "manual provider: newsletter {} considered sent",
            request.newsletter_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::NewsletterId;

    #[tokio::test]
    async fn every_operation_is_a_quiet_success() {
        let provider = ManualProvider::new();
        let email = EmailAddress::new("reader@example.com").unwrap();

        assert!(provider.has_api_credentials());
        assert_eq!(provider.get_lists().await.unwrap(), vec![]);
        assert_eq!(provider.get_contact(&email).await.unwrap(), None);
        assert!(provider
            .update_contact_lists(&email, &[], &[])
            .await
            .is_ok());
        assert!(provider
            .send(&SendRequest {
                newsletter_id: NewsletterId::new(1),
                subject: "s".into(),
                html: String::new(),
                html_url: None,
                list: None,
            })
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn tag_primitives_keep_the_uniform_default() {
        let provider = ManualProvider::new();
        let email = EmailAddress::new("reader@example.com").unwrap();
        assert!(!provider.supports_local_lists());
        assert!(matches!(
            provider.contact_tag_ids(&email).await,
            Err(EspError::NotSupported { .. })
        ));
    }
}
