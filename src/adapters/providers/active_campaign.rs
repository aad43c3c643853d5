//! ActiveCampaign provider.
//!
//! Contacts, native list memberships, and tag-based local-list emulation
//! over the v3 API. ActiveCampaign scopes tags to the account rather
//! than to a list, so the list argument of the tag primitives is unused
//! here. Campaign sending is not offered through the v3 API, so `send`
//! keeps the uniform not-supported default.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::contact::{Contact, EmailAddress};
use crate::domain::lists::{NativeListId, TagId};
use crate::domain::provider::ProviderKind;
use crate::ports::{
    ApiCredentials, EspContact, EspError, EspProvider, ProviderList, SendRequest,
};

use super::util::{ensure_success, transport_error, ESP_HTTP_TIMEOUT};

#[derive(Clone)]
struct ActiveCampaignCredentials {
    /// Account base URL, e.g. `https://newsroom.api-us1.com`.
    api_url: String,
    api_key: Secret<String>,
}

/// ActiveCampaign API provider implementation.
pub struct ActiveCampaignProvider {
    credentials: RwLock<Option<ActiveCampaignCredentials>>,
    client: Client,
    lists_cache: RwLock<Option<Vec<ProviderList>>>,
}

impl Default for ActiveCampaignProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveCampaignProvider {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(ESP_HTTP_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            credentials: RwLock::new(None),
            client,
            lists_cache: RwLock::new(None),
        }
    }

    fn creds(&self) -> Result<ActiveCampaignCredentials, EspError> {
        self.credentials
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
        let creds = self.creds()?;
        let response = self
            .client
            .get(format!("{}/api/3/{}", creds.api_url, path))
            .header("Api-Token", creds.api_key.expose_secret())
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

    async fn post_json<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, EspError> {
        let creds = self.creds()?;
        let response = self
            .client
            .post(format!("{}/api/3/{}", creds.api_url, path))
            .header("Api-Token", creds.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        ensure_success(response)
            .await?
            .json::<T>()
            .await
            .map_err(|e| EspError::parse(e.to_string()))
    }

    async fn delete(&self, path: &str) -> Result<(), EspError> {
        let creds = self.creds()?;
        let response = self
            .client
            .delete(format!("{}/api/3/{}", creds.api_url, path))
            .header("Api-Token", creds.api_key.expose_secret())
            .send()
            .await
            .map_err(transport_error)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        ensure_success(response).await?;
        Ok(())
    }

    async fn find_contact(&self, email: &EmailAddress) -> Result<Option<AcContact>, EspError> {
        let response: ContactsResponse = self
            .get_json("contacts", &[("email", email.as_str().to_string())])
            .await?;
        Ok(response.contacts.into_iter().next())
    }

    /// Upserts the contact record itself (no list membership).
    async fn sync_contact_record(&self, contact: &Contact) -> Result<AcContact, EspError> {
        let mut first_name = None;
        let mut last_name = None;
        if let Some(name) = &contact.name {
            let mut parts = name.splitn(2, ' ');
            first_name = parts.next().map(str::to_string);
            last_name = parts.next().map(str::to_string);
        }
        let response: ContactEnvelope = self
            .post_json(
                "contact/sync",
                &ContactSyncRequest {
                    contact: ContactSyncBody {
                        email: contact.email.as_str(),
                        first_name,
                        last_name,
                    },
                },
            )
            .await?;
        Ok(response.contact)
    }

    async fn require_contact(&self, email: &EmailAddress) -> Result<AcContact, EspError> {
        self.find_contact(email)
            .await?
            .ok_or_else(|| EspError::contact_not_found(email))
    }

    async fn set_list_status(
        &self,
        contact_id: &str,
        list: &NativeListId,
        status: &'static str,
    ) -> Result<(), EspError> {
        let _: serde_json::Value = self
            .post_json(
                "contactLists",
                &ContactListRequest {
                    contact_list: ContactListBody {
                        list: list.as_str(),
                        contact: contact_id,
                        status,
                    },
                },
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl EspProvider for ActiveCampaignProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ActiveCampaign
    }

    fn supports_local_lists(&self) -> bool {
        true
    }

    fn has_api_credentials(&self) -> bool {
        self.credentials.read().unwrap().is_some()
    }

    fn set_api_credentials(&self, credentials: ApiCredentials) -> Result<(), EspError> {
        let missing = credentials.missing_fields(&["api_url", "api_key"]);
        if !missing.is_empty() {
            return Err(EspError::invalid_credentials(missing));
        }
        let api_url = credentials
            .get("api_url")
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string();
        let api_key = credentials.get("api_key").unwrap_or_default().to_string();
        *self.credentials.write().unwrap() = Some(ActiveCampaignCredentials {
            api_url,
            api_key: Secret::new(api_key),
        });
        Ok(())
    }

    async fn get_lists(&self) -> Result<Vec<ProviderList>, EspError> {
        if let Some(cached) = self.lists_cache.read().unwrap().clone() {
            return Ok(cached);
        }
        let response: ListsResponse = self
            .get_json("lists", &[("limit", "100".to_string())])
            .await?;
        let lists: Vec<ProviderList> = response
            .lists
            .into_iter()
            .map(|l| ProviderList {
                id: NativeListId::new(l.id),
                name: l.name,
                member_count: None,
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
        let record = self.sync_contact_record(contact).await?;
        self.set_list_status(&record.id, list, SUBSCRIBED).await?;
        Ok(record.into_esp_contact(&contact.email))
    }

    async fn update_contact_lists(
        &self,
        email: &EmailAddress,
        to_add: &[NativeListId],
        to_remove: &[NativeListId],
    ) -> Result<(), EspError> {
        let record = self.require_contact(email).await?;
        for list in to_add {
            self.set_list_status(&record.id, list, SUBSCRIBED).await?;
        }
        for list in to_remove {
            self.set_list_status(&record.id, list, UNSUBSCRIBED).await?;
        }
        Ok(())
    }

    async fn contact_lists(&self, email: &EmailAddress) -> Result<Vec<NativeListId>, EspError> {
        let Some(record) = self.find_contact(email).await? else {
            return Ok(Vec::new());
        };
        let response: ContactListsResponse = self
            .get_json(&format!("contacts/{}/contactLists", record.id), &[])
            .await?;
        Ok(response
            .contact_lists
            .into_iter()
            .filter(|m| m.status == SUBSCRIBED)
            .map(|m| NativeListId::new(m.list))
            .collect())
    }

    async fn get_tag_id(
        &self,
        name: &str,
        create_if_missing: bool,
        list: &NativeListId,
    ) -> Result<TagId, EspError> {
        let response: TagsResponse = self
            .get_json("tags", &[("search", name.to_string())])
            .await?;
        if let Some(tag) = response.tags.into_iter().find(|t| t.tag == name) {
            return Ok(TagId::new(tag.id));
        }
        if create_if_missing {
            return self.create_tag(name, list).await;
        }
        Err(EspError::api(
            "tag_not_found",
            format!("no tag named '{}'", name),
        ))
    }

    async fn create_tag(&self, name: &str, _list: &NativeListId) -> Result<TagId, EspError> {
        let response: TagEnvelope = self
            .post_json(
                "tags",
                &TagCreateRequest {
                    tag: TagCreateBody {
                        tag: name,
                        tag_type: "contact",
                    },
                },
            )
            .await?;
        Ok(TagId::new(response.tag.id))
    }

    async fn add_tag_to_contact(
        &self,
        email: &EmailAddress,
        tag: &TagId,
        _list: &NativeListId,
    ) -> Result<(), EspError> {
        // Contact record must exist before a tag can attach to it.
        let record = match self.find_contact(email).await? {
            Some(record) => record,
            None => self.sync_contact_record(&Contact::new(email.clone())).await?,
        };
        let _: serde_json::Value = self
            .post_json(
                "contactTags",
                &ContactTagRequest {
                    contact_tag: ContactTagBody {
                        contact: &record.id,
                        tag: tag.as_str(),
                    },
                },
            )
            .await?;
        Ok(())
    }

    async fn remove_tag_from_contact(
        &self,
        email: &EmailAddress,
        tag: &TagId,
        _list: &NativeListId,
    ) -> Result<(), EspError> {
        let Some(record) = self.find_contact(email).await? else {
            return Ok(());
        };
        let response: ContactTagsResponse = self
            .get_json(&format!("contacts/{}/contactTags", record.id), &[])
            .await?;
        let Some(association) = response
            .contact_tags
            .into_iter()
            .find(|t| t.tag == tag.as_str())
        else {
            return Ok(());
        };
        self.delete(&format!("contactTags/{}", association.id)).await
    }

    async fn contact_tag_ids(&self, email: &EmailAddress) -> Result<Vec<TagId>, EspError> {
        let Some(record) = self.find_contact(email).await? else {
            return Ok(Vec::new());
        };
        let response: ContactTagsResponse = self
            .get_json(&format!("contacts/{}/contactTags", record.id), &[])
            .await?;
        Ok(response
            .contact_tags
            .into_iter()
            .map(|t| TagId::new(t.tag))
            .collect())
    }

    async fn send(&self, _request: &SendRequest) -> Result<(), EspError> {
        Err(EspError::not_supported(self.kind(), "send"))
    }
}

const SUBSCRIBED: &str = "1";
const UNSUBSCRIBED: &str = "2";

// Wire types. ActiveCampaign serializes every id as a string.

#[derive(Debug, Deserialize)]
struct ListsResponse {
    lists: Vec<AcList>,
}

#[derive(Debug, Deserialize)]
struct AcList {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ContactsResponse {
    contacts: Vec<AcContact>,
}

#[derive(Debug, Deserialize)]
struct ContactEnvelope {
    contact: AcContact,
}

#[derive(Debug, Deserialize)]
struct AcContact {
    id: String,
    #[serde(default, rename = "firstName")]
    first_name: String,
    #[serde(default, rename = "lastName")]
    last_name: String,
}

impl AcContact {
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
struct ContactSyncRequest<'a> {
    contact: ContactSyncBody<'a>,
}

#[derive(Debug, Serialize)]
struct ContactSyncBody<'a> {
    email: &'a str,
    #[serde(rename = "firstName", skip_serializing_if = "Option::is_none")]
    first_name: Option<String>,
    #[serde(rename = "lastName", skip_serializing_if = "Option::is_none")]
    last_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct ContactListRequest<'a> {
    #[serde(rename = "contactList")]
    contact_list: ContactListBody<'a>,
}

#[derive(Debug, Serialize)]
struct ContactListBody<'a> {
    list: &'a str,
    contact: &'a str,
    status: &'static str,
}

#[derive(Debug, Deserialize)]
struct ContactListsResponse {
    #[serde(rename = "contactLists")]
    contact_lists: Vec<ContactListMembership>,
}

#[derive(Debug, Deserialize)]
struct ContactListMembership {
    list: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    tags: Vec<AcTag>,
}

#[derive(Debug, Deserialize)]
struct TagEnvelope {
    tag: AcTag,
}

#[derive(Debug, Deserialize)]
struct AcTag {
    id: String,
    #[serde(default)]
    tag: String,
}

#[derive(Debug, Serialize)]
struct TagCreateRequest<'a> {
    tag: TagCreateBody<'a>,
}

#[derive(Debug, Serialize)]
struct TagCreateBody<'a> {
    tag: &'a str,
    #[serde(rename = "tagType")]
    tag_type: &'static str,
}

#[derive(Debug, Serialize)]
struct ContactTagRequest<'a> {
    #[serde(rename = "contactTag")]
    contact_tag: ContactTagBody<'a>,
}

#[derive(Debug, Serialize)]
struct ContactTagBody<'a> {
    contact: &'a str,
    tag: &'a str,
}

#[derive(Debug, Deserialize)]
struct ContactTagsResponse {
    #[serde(rename = "contactTags")]
    contact_tags: Vec<ContactTagAssociation>,
}

#[derive(Debug, Deserialize)]
struct ContactTagAssociation {
    id: String,
    #[serde(default)]
    tag: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_require_url_and_key() {
        let provider = ActiveCampaignProvider::new();
        let err = provider
            .set_api_credentials(ApiCredentials::new().with_field("api_key", "k"))
            .unwrap_err();
        assert_eq!(err, EspError::invalid_credentials(vec!["api_url"]));

        provider
            .set_api_credentials(
                ApiCredentials::new()
                    .with_field("api_url", "https://newsroom.api-us1.com/")
                    .with_field("api_key", "k"),
            )
            .unwrap();
        assert!(provider.has_api_credentials());
        // Trailing slash is normalized away.
        assert_eq!(
            provider.creds().unwrap().api_url,
            "https://newsroom.api-us1.com"
        );
    }

    #[test]
    fn send_is_uniformly_unsupported() {
        let provider = ActiveCampaignProvider::new();
        assert!(provider.supports_local_lists());
        // The error is static and predictable regardless of request shape.
        let err = EspError::not_supported(provider.kind(), "send");
        assert_eq!(err.to_string(), "active_campaign does not support send");
    }

    #[test]
    fn contact_name_is_assembled_from_parts() {
        let contact = AcContact {
            id: "1".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
        };
        let esp = contact.into_esp_contact(&EmailAddress::new("r@example.com").unwrap());
        assert_eq!(esp.name.as_deref(), Some("Ada Lovelace"));
    }
}
