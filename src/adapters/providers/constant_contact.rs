//! Constant Contact provider.
//!
//! Contacts and native list memberships over the v3 API. The
//! `sign_up_form` endpoint is a true upsert, which is what makes
//! repeated adds idempotent. No tag mechanism fits local-list
//! emulation, and campaign sending is not offered, so both keep the
//! uniform not-supported default.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::contact::{Contact, EmailAddress};
use crate::domain::lists::NativeListId;
use crate::domain::provider::ProviderKind;
use crate::ports::{
    ApiCredentials, EspContact, EspError, EspProvider, ProviderList, SendRequest,
};

use super::util::{ensure_success, transport_error, ESP_HTTP_TIMEOUT};

const API_BASE: &str = "https://api.cc.email/v3";

/// Constant Contact API provider implementation.
pub struct ConstantContactProvider {
    access_token: RwLock<Option<Secret<String>>>,
    client: Client,
    lists_cache: RwLock<Option<Vec<ProviderList>>>,
}

impl Default for ConstantContactProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantContactProvider {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(ESP_HTTP_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            access_token: RwLock::new(None),
            client,
            lists_cache: RwLock::new(None),
        }
    }

    fn token(&self) -> Result<Secret<String>, EspError> {
        self.access_token
            .read()
            .unwrap()
            .clone()
            .ok_or(EspError::MissingCredentials)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, EspError> {
        let token = self.token()?;
        let response = self
            .client
            .get(format!("{}/{}", API_BASE, path))
            .bearer_auth(token.expose_secret())
            .query(query)
            .send()
            .await
            .map_err(transport_error)?;
        ensure_success(response)
            .await?
            .json::<T>()
            .await
            .map_err(|e| EspError::parse(e.to_string()))
    }

    async fn find_contact(&self, email: &EmailAddress) -> Result<Option<CcContact>, EspError> {
        let response: ContactsResponse = self
            .get_json(
                "contacts",
                &[
                    ("email", email.as_str().to_string()),
                    ("include", "list_memberships".to_string()),
                    ("status", "all".to_string()),
                ],
            )
            .await?;
        Ok(response.contacts.into_iter().next())
    }

    /// Replaces an existing contact's list membership set.
    async fn put_memberships(
        &self,
        contact_id: &str,
        email: &EmailAddress,
        list_memberships: Vec<String>,
    ) -> Result<(), EspError> {
        let token = self.token()?;
        let response = self
            .client
            .put(format!("{}/contacts/{}", API_BASE, contact_id))
            .bearer_auth(token.expose_secret())
            .json(&ContactUpdate {
                email_address: ContactEmail {
                    address: email.as_str(),
                    permission_to_send: "implicit",
                },
                list_memberships,
                update_source: "Account",
            })
            .send()
            .await
            .map_err(transport_error)?;
        ensure_success(response).await?;
        Ok(())
    }

    /// Upserts a contact, adding the given list memberships.
    async fn sign_up(
        &self,
        contact: &Contact,
        list_memberships: Vec<String>,
    ) -> Result<(), EspError> {
        let token = self.token()?;
        let mut first_name = None;
        let mut last_name = None;
        if let Some(name) = &contact.name {
            let mut parts = name.splitn(2, ' ');
            first_name = parts.next().map(str::to_string);
            last_name = parts.next().map(str::to_string);
        }
        let response = self
            .client
            .post(format!("{}/contacts/sign_up_form", API_BASE))
            .bearer_auth(token.expose_secret())
            .json(&SignUpForm {
                email_address: contact.email.as_str(),
                first_name,
                last_name,
                list_memberships,
            })
            .send()
            .await
            .map_err(transport_error)?;
        ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl EspProvider for ConstantContactProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ConstantContact
    }

    fn has_api_credentials(&self) -> bool {
        self.access_token.read().unwrap().is_some()
    }

    fn set_api_credentials(&self, credentials: ApiCredentials) -> Result<(), EspError> {
        let missing = credentials.missing_fields(&["access_token"]);
        if !missing.is_empty() {
            return Err(EspError::invalid_credentials(missing));
        }
        let token = credentials
            .get("access_token")
            .unwrap_or_default()
            .to_string();
        *self.access_token.write().unwrap() = Some(Secret::new(token));
        Ok(())
    }

    async fn get_lists(&self) -> Result<Vec<ProviderList>, EspError> {
        if let Some(cached) = self.lists_cache.read().unwrap().clone() {
            return Ok(cached);
        }
        let response: ListsResponse = self
            .get_json(
                "contact_lists",
                &[("include_membership_count", "active".to_string())],
            )
            .await?;
        let lists: Vec<ProviderList> = response
            .lists
            .into_iter()
            .map(|l| ProviderList {
                id: NativeListId::new(l.list_id),
                name: l.name,
                member_count: l.membership_count,
            })
            .collect();
        *self.lists_cache.write().unwrap() = Some(lists.clone());
        Ok(lists)
    }

    async fn get_contact(&self, email: &EmailAddress) -> Result<Option<EspContact>, EspError> {
        Ok(self
            .find_contact(email)
            .await?
            .map(|c| c.into_esp_contact(email)))
    }

    async fn add_contact(
        &self,
        contact: &Contact,
        list: &NativeListId,
    ) -> Result<EspContact, EspError> {
        self.sign_up(contact, vec![list.as_str().to_string()]).await?;
        Ok(EspContact {
            email: contact.email.clone(),
            name: contact.name.clone(),
            metadata: contact.metadata.clone(),
        })
    }

    async fn update_contact_lists(
        &self,
        email: &EmailAddress,
        to_add: &[NativeListId],
        to_remove: &[NativeListId],
    ) -> Result<(), EspError> {
        let Some(existing) = self.find_contact(email).await? else {
            // Unknown contact: nothing to remove, just sign up with the
            // additions.
            let additions = to_add.iter().map(|l| l.as_str().to_string()).collect();
            return self.sign_up(&Contact::new(email.clone()), additions).await;
        };

        // The sign-up form only ever adds, so removal replaces the full
        // membership set on the contact record.
        let mut memberships = existing.list_memberships.clone();
        for list in to_add {
            if !memberships.iter().any(|m| m == list.as_str()) {
                memberships.push(list.as_str().to_string());
            }
        }
        memberships.retain(|m| !to_remove.iter().any(|list| list.as_str() == m));

        self.put_memberships(&existing.contact_id, email, memberships)
            .await
    }

    async fn contact_lists(&self, email: &EmailAddress) -> Result<Vec<NativeListId>, EspError> {
        Ok(self
            .find_contact(email)
            .await?
            .map(|c| {
                c.list_memberships
                    .into_iter()
                    .map(NativeListId::new)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn send(&self, _request: &SendRequest) -> Result<(), EspError> {
        Err(EspError::not_supported(self.kind(), "send"))
    }
}

// Wire types.

#[derive(Debug, Deserialize)]
struct ListsResponse {
    lists: Vec<CcList>,
}

#[derive(Debug, Deserialize)]
struct CcList {
    list_id: String,
    name: String,
    #[serde(default)]
    membership_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ContactsResponse {
    contacts: Vec<CcContact>,
}

#[derive(Debug, Deserialize)]
struct CcContact {
    contact_id: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    list_memberships: Vec<String>,
}

impl CcContact {
    fn into_esp_contact(self, email: &EmailAddress) -> EspContact {
        let name = match (self.first_name.is_empty(), self.last_name.is_empty()) {
            (false, false) => Some(format!("{} {}", self.first_name, self.last_name)),
            (false, true) => Some(self.first_name),
            _ => None,
        };
        EspContact {
            email: email.clone(),
            name,
            metadata: HashMap::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ContactUpdate<'a> {
    email_address: ContactEmail<'a>,
    list_memberships: Vec<String>,
    update_source: &'static str,
}

#[derive(Debug, Serialize)]
struct ContactEmail<'a> {
    address: &'a str,
    permission_to_send: &'static str,
}

#[derive(Debug, Serialize)]
struct SignUpForm<'a> {
    email_address: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_name: Option<String>,
    list_memberships: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_and_send_are_unsupported() {
        let provider = ConstantContactProvider::new();
        assert!(!provider.supports_local_lists());
    }

    #[test]
    fn access_token_is_required() {
        let provider = ConstantContactProvider::new();
        let err = provider
            .set_api_credentials(ApiCredentials::new())
            .unwrap_err();
        assert_eq!(err, EspError::invalid_credentials(vec!["access_token"]));

        provider
            .set_api_credentials(ApiCredentials::new().with_field("access_token", "tok"))
            .unwrap();
        assert!(provider.has_api_credentials());
    }

    #[tokio::test]
    async fn operations_without_credentials_fail_fast() {
        let provider = ConstantContactProvider::new();
        assert_eq!(
            provider.get_lists().await,
            Err(EspError::MissingCredentials)
        );
    }
}
