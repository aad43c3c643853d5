//! Campaign Monitor provider.
//!
//! Native lists only: Campaign Monitor has no tag mechanism suitable for
//! local-list emulation, so the native list is the only source of truth
//! and the tag primitives keep their not-supported default. Campaign
//! sends work from a hosted HTML URL, which is how newsletters are
//! published anyway.

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

const API_BASE: &str = "https://api.createsend.com/api/v3.3";

#[derive(Clone)]
struct CampaignMonitorCredentials {
    api_key: Secret<String>,
    client_id: String,
}

/// Campaign Monitor API provider implementation.
pub struct CampaignMonitorProvider {
    credentials: RwLock<Option<CampaignMonitorCredentials>>,
    client: Client,
    lists_cache: RwLock<Option<Vec<ProviderList>>>,
}

impl Default for CampaignMonitorProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CampaignMonitorProvider {
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

    fn creds(&self) -> Result<CampaignMonitorCredentials, EspError> {
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
            .get(format!("{}/{}", API_BASE, path))
            .basic_auth(creds.api_key.expose_secret(), Some("x"))
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
            .post(format!("{}/{}", API_BASE, path))
            .basic_auth(creds.api_key.expose_secret(), Some("x"))
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

    /// Looks a subscriber up on one list; `None` when not on it.
    async fn subscriber_on_list(
        &self,
        email: &EmailAddress,
        list: &NativeListId,
    ) -> Result<Option<Subscriber>, EspError> {
        let creds = self.creds()?;
        let response = self
            .client
            .get(format!("{}/subscribers/{}.json", API_BASE, list))
            .basic_auth(creds.api_key.expose_secret(), Some("x"))
            .query(&[("email", email.as_str())])
            .send()
            .await
            .map_err(transport_error)?;
        if response.status() == reqwest::StatusCode::BAD_REQUEST
            || response.status() == reqwest::StatusCode::NOT_FOUND
        {
            return Ok(None);
        }
        let subscriber = ensure_success(response)
            .await?
            .json::<Subscriber>()
            .await
            .map_err(|e| EspError::parse(e.to_string()))?;
        Ok(Some(subscriber))
    }
}

#[async_trait]
impl EspProvider for CampaignMonitorProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::CampaignMonitor
    }

    fn has_api_credentials(&self) -> bool {
        self.credentials.read().unwrap().is_some()
    }

    fn set_api_credentials(&self, credentials: ApiCredentials) -> Result<(), EspError> {
        let missing = credentials.missing_fields(&["api_key", "client_id"]);
        if !missing.is_empty() {
            return Err(EspError::invalid_credentials(missing));
        }
        *self.credentials.write().unwrap() = Some(CampaignMonitorCredentials {
            api_key: Secret::new(credentials.get("api_key").unwrap_or_default().to_string()),
            client_id: credentials.get("client_id").unwrap_or_default().to_string(),
        });
        Ok(())
    }

    async fn get_lists(&self) -> Result<Vec<ProviderList>, EspError> {
        if let Some(cached) = self.lists_cache.read().unwrap().clone() {
            return Ok(cached);
        }
        let creds = self.creds()?;
        let response: Vec<CmList> = self
            .get_json(&format!("clients/{}/lists.json", creds.client_id), &[])
            .await?;
        let lists: Vec<ProviderList> = response
            .into_iter()
            .map(|l| ProviderList {
                id: NativeListId::new(l.list_id),
                name: l.name,
                member_count: None,
            })
            .collect();
        *self.lists_cache.write().unwrap() = Some(lists.clone());
        Ok(lists)
    }

    async fn get_contact(&self, email: &EmailAddress) -> Result<Option<EspContact>, EspError> {
        for list in self.get_lists().await? {
            if let Some(subscriber) = self.subscriber_on_list(email, &list.id).await? {
                return Ok(Some(subscriber.into_contact(email)));
            }
        }
        Ok(None)
    }

    async fn add_contact(
        &self,
        contact: &Contact,
        list: &NativeListId,
    ) -> Result<EspContact, EspError> {
        // Resubscribe makes a repeated add converge on "subscribed"
        // instead of erroring on the existing record.
        let _: serde_json::Value = self
            .post_json(
                &format!("subscribers/{}.json", list),
                &SubscriberAdd {
                    email_address: contact.email.as_str(),
                    name: contact.name.as_deref(),
                    resubscribe: true,
                    consent_to_track: "Unchanged",
                },
            )
            .await?;
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
        let contact = Contact::new(email.clone());
        for list in to_add {
            self.add_contact(&contact, list).await?;
        }
        for list in to_remove {
            let _: serde_json::Value = self
                .post_json(
                    &format!("subscribers/{}/unsubscribe.json", list),
                    &Unsubscribe {
                        email_address: email.as_str(),
                    },
                )
                .await?;
        }
        Ok(())
    }

    async fn contact_lists(&self, email: &EmailAddress) -> Result<Vec<NativeListId>, EspError> {
        let mut lists = Vec::new();
        for list in self.get_lists().await? {
            if let Some(subscriber) = self.subscriber_on_list(email, &list.id).await? {
                if subscriber.state == "Active" {
                    lists.push(list.id);
                }
            }
        }
        Ok(lists)
    }

    async fn send(&self, request: &SendRequest) -> Result<(), EspError> {
        let Some(html_url) = &request.html_url else {
            return Err(EspError::api(
                "precondition_failed",
                "campaign monitor sends from a hosted HTML URL",
            ));
        };
        let creds = self.creds()?;
        let campaign_id: String = self
            .post_json(
                &format!("campaigns/{}.json", creds.client_id),
                &CampaignCreate {
                    name: &request.subject,
                    subject: &request.subject,
                    html_url,
                    list_ids: request.list.iter().map(|l| l.as_str().to_string()).collect(),
                },
            )
            .await?;
        let _: serde_json::Value = self
            .post_json(
                &format!("campaigns/{}/send.json", campaign_id),
                &CampaignSend {
                    send_date: "Immediately",
                },
            )
            .await?;
        tracing::info!("campaign monitor campaign {} sent", campaign_id);
        Ok(())
    }
}

// Wire types. Campaign Monitor uses PascalCase field names.

#[derive(Debug, Deserialize)]
struct CmList {
    #[serde(rename = "ListID")]
    list_id: String,
    #[serde(rename = "Name")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct Subscriber {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "State", default)]
    state: String,
}

impl Subscriber {
    fn into_contact(self, email: &EmailAddress) -> EspContact {
        EspContact {
            email: email.clone(),
            name: (!self.name.is_empty()).then_some(self.name),
            metadata: HashMap::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SubscriberAdd<'a> {
    #[serde(rename = "EmailAddress")]
    email_address: &'a str,
    #[serde(rename = "Name", skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(rename = "Resubscribe")]
    resubscribe: bool,
    #[serde(rename = "ConsentToTrack")]
    consent_to_track: &'static str,
}

#[derive(Debug, Serialize)]
struct Unsubscribe<'a> {
    #[serde(rename = "EmailAddress")]
    email_address: &'a str,
}

#[derive(Debug, Serialize)]
struct CampaignCreate<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Subject")]
    subject: &'a str,
    #[serde(rename = "HtmlUrl")]
    html_url: &'a str,
    #[serde(rename = "ListIDs")]
    list_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CampaignSend {
    #[serde(rename = "SendDate")]
    send_date: &'static str,
}
