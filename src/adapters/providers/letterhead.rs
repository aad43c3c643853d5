//! Letterhead provider.
//!
//! Letterhead is a promotions partner, not a contact store: it carries no
//! lists and no contacts of its own, so the contact surface answers with
//! the uniform not-supported error and delivery stays with the newsroom's
//! actual ESP.

use async_trait::async_trait;
use secrecy::Secret;
use std::sync::RwLock;

use crate::domain::contact::{Contact, EmailAddress};
use crate::domain::lists::NativeListId;
use crate::domain::provider::ProviderKind;
use crate::ports::{
    ApiCredentials, EspContact, EspError, EspProvider, ProviderList, SendRequest,
};

/// Promotions partner stub in the provider set.
#[derive(Default)]
pub struct LetterheadProvider {
    api_key: RwLock<Option<Secret<String>>>,
}

impl LetterheadProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn unsupported(&self, operation: &'static str) -> EspError {
        EspError::not_supported(self.kind(), operation)
    }
}

#[async_trait]
impl EspProvider for LetterheadProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Letterhead
    }

    fn has_api_credentials(&self) -> bool {
        self.api_key.read().unwrap().is_some()
    }

    fn set_api_credentials(&self, credentials: ApiCredentials) -> Result<(), EspError> {
        let missing = credentials.missing_fields(&["api_key"]);
        if !missing.is_empty() {
            return Err(EspError::invalid_credentials(missing));
        }
        let key = credentials.get("api_key").unwrap_or_default().to_string();
        *self.api_key.write().unwrap() = Some(Secret::new(key));
        Ok(())
    }

    async fn get_lists(&self) -> Result<Vec<ProviderList>, EspError> {
        Ok(Vec::new())
    }

    async fn get_contact(&self, _email: &EmailAddress) -> Result<Option<EspContact>, EspError> {
        Err(self.unsupported("get_contact"))
    }

    async fn add_contact(
        &self,
        _contact: &Contact,
        _list: &NativeListId,
    ) -> Result<EspContact, EspError> {
        Err(self.unsupported("add_contact"))
    }

    async fn update_contact_lists(
        &self,
        _email: &EmailAddress,
        _to_add: &[NativeListId],
        _to_remove: &[NativeListId],
    ) -> Result<(), EspError> {
        Err(self.unsupported("update_contact_lists"))
    }

    async fn contact_lists(&self, _email: &EmailAddress) -> Result<Vec<NativeListId>, EspError> {
        Err(self.unsupported("contact_lists"))
    }

    async fn send(&self, _request: &SendRequest) -> Result<(), EspError> {
        Err(self.unsupported("send"))
    }
}
