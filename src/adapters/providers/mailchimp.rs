//! Mailchimp provider.
//!
//! Implements the full contract: audiences, contact upsert, native list
//! membership, tag-based local-list emulation (Mailchimp static
//! segments), campaign send, and the activity-based usage report.
//!
//! # Authentication
//!
//! HTTP basic auth with the API key; the datacenter prefix is derived
//! from the key's `-usN` suffix.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::contact::{Contact, EmailAddress};
use crate::domain::lists::{NativeListId, TagId};
use crate::domain::provider::ProviderKind;
use crate::domain::reporting::{ReportingPeriod, UsageReport};
use crate::ports::{
    ApiCredentials, EspContact, EspError, EspProvider, ProviderList, ProviderSegment, SendRequest,
};

use super::util::{ensure_success, transport_error, ESP_HTTP_TIMEOUT};

/// Stored Mailchimp credentials.
#[derive(Clone)]
struct MailchimpCredentials {
    api_key: Secret<String>,
    /// Datacenter, e.g. `us5`, taken from the key suffix.
    server_prefix: String,
}

/// Mailchimp API provider implementation.
pub struct MailchimpProvider {
    credentials: RwLock<Option<MailchimpCredentials>>,
    client: Client,
    /// Audiences change rarely; cached for the lifetime of one request.
    lists_cache: RwLock<Option<Vec<ProviderList>>>,
}

impl Default for MailchimpProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MailchimpProvider {
    /// Creates a provider with no stored credentials.
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

    /// Creates a provider with credentials already set.
    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self, EspError> {
        let provider = Self::new();
        provider.set_api_credentials(
            ApiCredentials::new().with_field("api_key", api_key.into()),
        )?;
        Ok(provider)
    }

    fn creds(&self) -> Result<MailchimpCredentials, EspError> {
        self.credentials
            .read()
            .unwrap()
            .clone()
            .ok_or(EspError::MissingCredentials)
    }

    fn url(&self, creds: &MailchimpCredentials, path: &str) -> String {
        format!(
            "https://{}.api.mailchimp.com/3.0/{}",
            creds.server_prefix, path
        )
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, EspError> {
        let creds = self.creds()?;
        let response = self
            .client
            .get(self.url(&creds, path))
            .basic_auth("apikey", Some(creds.api_key.expose_secret()))
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
            .post(self.url(&creds, path))
            .basic_auth("apikey", Some(creds.api_key.expose_secret()))
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

    async fn delete(&self, path: &str, tolerate_missing: bool) -> Result<(), EspError> {
        let creds = self.creds()?;
        let response = self
            .client
            .delete(self.url(&creds, path))
            .basic_auth("apikey", Some(creds.api_key.expose_secret()))
            .send()
            .await
            .map_err(transport_error)?;
        if tolerate_missing && response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        ensure_success(response).await?;
        Ok(())
    }

    /// Every exact member match for an email, across audiences.
    async fn find_members(&self, email: &EmailAddress) -> Result<Vec<Member>, EspError> {
        let response: SearchMembersResponse = self
            .get_json(
                "search-members",
                &[("query", email.as_str().to_string())],
            )
            .await?;
        Ok(response.exact_matches.members)
    }

    /// The member record on one specific audience, if any.
    async fn member_on_list(
        &self,
        email: &EmailAddress,
        list: &NativeListId,
    ) -> Result<Option<Member>, EspError> {
        let members = self.find_members(email).await?;
        Ok(members.into_iter().find(|m| m.list_id == list.as_str()))
    }

    /// Upserts a member onto an audience. Safe to repeat: an existing
    /// member is left subscribed, not duplicated.
    async fn upsert_member(
        &self,
        contact: &Contact,
        list: &NativeListId,
    ) -> Result<Member, EspError> {
        let creds = self.creds()?;
        let body = MemberUpsert::from_contact(contact);
        let response = self
            .client
            .post(self.url(&creds, &format!("lists/{}/members", list)))
            .basic_auth("apikey", Some(creds.api_key.expose_secret()))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status().is_success() {
            return response
                .json::<Member>()
                .await
                .map_err(|e| EspError::parse(e.to_string()));
        }
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::BAD_REQUEST && text.contains("Member Exists") {
            return self
                .member_on_list(&contact.email, list)
                .await?
                .ok_or_else(|| EspError::contact_not_found(&contact.email));
        }
        Err(EspError::api(status.as_str(), text))
    }
}

#[async_trait]
impl EspProvider for MailchimpProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Mailchimp
    }

    fn supports_local_lists(&self) -> bool {
        true
    }

    fn has_api_credentials(&self) -> bool {
        self.credentials.read().unwrap().is_some()
    }

    fn set_api_credentials(&self, credentials: ApiCredentials) -> Result<(), EspError> {
        let missing = credentials.missing_fields(&["api_key"]);
        if !missing.is_empty() {
            return Err(EspError::invalid_credentials(missing));
        }
        let key = credentials.get("api_key").unwrap_or_default().to_string();
        // Keys look like `<hex>-us5`; the suffix is the datacenter.
        let Some((_, prefix)) = key.rsplit_once('-') else {
            return Err(EspError::invalid_credentials(vec!["api_key"]));
        };
        if prefix.is_empty() {
            return Err(EspError::invalid_credentials(vec!["api_key"]));
        }
        *self.credentials.write().unwrap() = Some(MailchimpCredentials {
            server_prefix: prefix.to_string(),
            api_key: Secret::new(key),
        });
        Ok(())
    }

    async fn get_lists(&self) -> Result<Vec<ProviderList>, EspError> {
        if let Some(cached) = self.lists_cache.read().unwrap().clone() {
            return Ok(cached);
        }
        let response: ListsResponse = self
            .get_json("lists", &[("count", "1000".to_string())])
            .await?;
        let lists: Vec<ProviderList> = response
            .lists
            .into_iter()
            .map(|l| ProviderList {
                id: NativeListId::new(l.id),
                name: l.name,
                member_count: l.stats.map(|s| s.member_count),
            })
            .collect();
        *self.lists_cache.write().unwrap() = Some(lists.clone());
        Ok(lists)
    }

    async fn get_segments(&self) -> Result<Vec<ProviderSegment>, EspError> {
        let mut segments = Vec::new();
        for list in self.get_lists().await? {
            let response: SegmentsResponse = self
                .get_json(
                    &format!("lists/{}/segments", list.id),
                    &[("count", "1000".to_string())],
                )
                .await?;
            segments.extend(response.segments.into_iter().map(|s| ProviderSegment {
                id: s.id.to_string(),
                name: s.name,
            }));
        }
        Ok(segments)
    }

    async fn get_contact(&self, email: &EmailAddress) -> Result<Option<EspContact>, EspError> {
        let members = self.find_members(email).await?;
        Ok(members.into_iter().next().map(|m| m.into_contact(email)))
    }

    async fn add_contact(
        &self,
        contact: &Contact,
        list: &NativeListId,
    ) -> Result<EspContact, EspError> {
        let member = self.upsert_member(contact, list).await?;
        Ok(member.into_contact(&contact.email))
    }

    async fn update_contact_lists(
        &self,
        email: &EmailAddress,
        to_add: &[NativeListId],
        to_remove: &[NativeListId],
    ) -> Result<(), EspError> {
        let contact = Contact::new(email.clone());
        for list in to_add {
            self.upsert_member(&contact, list).await?;
        }
        for list in to_remove {
            // Absent membership makes removal a no-op.
            if let Some(member) = self.member_on_list(email, list).await? {
                self.delete(&format!("lists/{}/members/{}", list, member.id), true)
                    .await?;
            }
        }
        Ok(())
    }

    async fn contact_lists(&self, email: &EmailAddress) -> Result<Vec<NativeListId>, EspError> {
        let members = self.find_members(email).await?;
        Ok(members
            .into_iter()
            .filter(|m| m.status == "subscribed" || m.status == "pending")
            .map(|m| NativeListId::new(m.list_id))
            .collect())
    }

    async fn get_tag_id(
        &self,
        name: &str,
        create_if_missing: bool,
        list: &NativeListId,
    ) -> Result<TagId, EspError> {
        let response: SegmentsResponse = self
            .get_json(
                &format!("lists/{}/segments", list),
                &[("type", "static".to_string()), ("count", "1000".to_string())],
            )
            .await?;
        if let Some(segment) = response.segments.into_iter().find(|s| s.name == name) {
            return Ok(TagId::new(segment.id.to_string()));
        }
        if create_if_missing {
            return self.create_tag(name, list).await;
        }
        Err(EspError::api(
            "tag_not_found",
            format!("no tag named '{}' on list {}", name, list),
        ))
    }

    async fn create_tag(&self, name: &str, list: &NativeListId) -> Result<TagId, EspError> {
        let segment: Segment = self
            .post_json(
                &format!("lists/{}/segments", list),
                &SegmentCreate {
                    name,
                    static_segment: Vec::new(),
                },
            )
            .await?;
        Ok(TagId::new(segment.id.to_string()))
    }

    async fn add_tag_to_contact(
        &self,
        email: &EmailAddress,
        tag: &TagId,
        list: &NativeListId,
    ) -> Result<(), EspError> {
        // Tags attach to audience members, so membership comes first.
        let contact = Contact::new(email.clone());
        self.upsert_member(&contact, list).await?;
        let _: Member = self
            .post_json(
                &format!("lists/{}/segments/{}/members", list, tag),
                &SegmentMemberAdd {
                    email_address: email.as_str(),
                },
            )
            .await?;
        Ok(())
    }

    async fn remove_tag_from_contact(
        &self,
        email: &EmailAddress,
        tag: &TagId,
        list: &NativeListId,
    ) -> Result<(), EspError> {
        let Some(member) = self.member_on_list(email, list).await? else {
            return Ok(());
        };
        self.delete(
            &format!("lists/{}/segments/{}/members/{}", list, tag, member.id),
            true,
        )
        .await
    }

    async fn contact_tag_ids(&self, email: &EmailAddress) -> Result<Vec<TagId>, EspError> {
        let members = self.find_members(email).await?;
        let mut tags: Vec<TagId> = members
            .into_iter()
            .flat_map(|m| m.tags)
            .map(|t| TagId::new(t.id.to_string()))
            .collect();
        tags.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        tags.dedup();
        Ok(tags)
    }

    async fn send(&self, request: &SendRequest) -> Result<(), EspError> {
        let list = match &request.list {
            Some(list) => list.clone(),
            None => self
                .get_lists()
                .await?
                .into_iter()
                .next()
                .map(|l| l.id)
                .ok_or_else(|| EspError::list_not_found("default audience"))?,
        };

        let campaign: Campaign = self
            .post_json(
                "campaigns",
                &CampaignCreate {
                    campaign_type: "regular",
                    recipients: CampaignRecipients {
                        list_id: list.as_str(),
                    },
                    settings: CampaignSettings {
                        subject_line: &request.subject,
                        title: &request.subject,
                    },
                },
            )
            .await?;

        let creds = self.creds()?;
        let response = self
            .client
            .put(self.url(&creds, &format!("campaigns/{}/content", campaign.id)))
            .basic_auth("apikey", Some(creds.api_key.expose_secret()))
            .json(&CampaignContent {
                html: &request.html,
            })
            .send()
            .await
            .map_err(transport_error)?;
        ensure_success(response).await?;

        let response = self
            .client
            .post(self.url(&creds, &format!("campaigns/{}/actions/send", campaign.id)))
            .basic_auth("apikey", Some(creds.api_key.expose_secret()))
            .send()
            .await
            .map_err(transport_error)?;
        ensure_success(response).await?;
        tracing::info!("mailchimp campaign {} sent", campaign.id);
        Ok(())
    }

    async fn usage_report(&self) -> Result<UsageReport, EspError> {
        let yesterday = ReportingPeriod::yesterday().start.date().to_string();
        let mut report = UsageReport::new();
        for list in self.get_lists().await? {
            report.total_contacts += list.member_count.unwrap_or(0);
            let activity: ActivityResponse = self
                .get_json(
                    &format!("lists/{}/activity", list.id),
                    &[("count", "2".to_string())],
                )
                .await?;
            if let Some(day) = activity.activity.into_iter().find(|a| a.day == yesterday) {
                report.emails_sent += day.emails_sent;
                report.opens += day.unique_opens;
                report.clicks += day.recipient_clicks;
                report.subscribes += day.subs;
                report.unsubscribes += day.unsubs;
            }
        }
        Ok(report)
    }
}

// Wire types.

#[derive(Debug, Deserialize)]
struct ListsResponse {
    lists: Vec<AudienceList>,
}

#[derive(Debug, Deserialize)]
struct AudienceList {
    id: String,
    name: String,
    stats: Option<AudienceStats>,
}

#[derive(Debug, Deserialize)]
struct AudienceStats {
    member_count: u64,
}

#[derive(Debug, Deserialize)]
struct SearchMembersResponse {
    exact_matches: ExactMatches,
}

#[derive(Debug, Deserialize)]
struct ExactMatches {
    members: Vec<Member>,
}

#[derive(Debug, Deserialize)]
struct Member {
    /// Mailchimp's member id doubles as the subscriber hash in paths.
    id: String,
    list_id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    merge_fields: HashMap<String, serde_json::Value>,
    #[serde(default)]
    tags: Vec<MemberTag>,
}

impl Member {
    fn into_contact(self, email: &EmailAddress) -> EspContact {
        let name = match (
            self.merge_fields.get("FNAME").and_then(|v| v.as_str()),
            self.merge_fields.get("LNAME").and_then(|v| v.as_str()),
        ) {
            (Some(first), Some(last)) if !first.is_empty() && !last.is_empty() => {
                Some(format!("{} {}", first, last))
            }
            (Some(first), _) if !first.is_empty() => Some(first.to_string()),
            _ => None,
        };
        EspContact {
            email: email.clone(),
            name,
            metadata: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MemberTag {
    id: u64,
    #[allow(dead_code)]
    name: String,
}

#[derive(Debug, Serialize)]
struct MemberUpsert {
    email_address: String,
    status_if_new: &'static str,
    status: &'static str,
    merge_fields: HashMap<&'static str, String>,
}

impl MemberUpsert {
    fn from_contact(contact: &Contact) -> Self {
        let mut merge_fields = HashMap::new();
        if let Some(name) = &contact.name {
            let mut parts = name.splitn(2, ' ');
            if let Some(first) = parts.next() {
                merge_fields.insert("FNAME", first.to_string());
            }
            if let Some(last) = parts.next() {
                merge_fields.insert("LNAME", last.to_string());
            }
        }
        Self {
            email_address: contact.email.to_string(),
            status_if_new: "subscribed",
            status: "subscribed",
            merge_fields,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SegmentsResponse {
    segments: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
struct Segment {
    id: u64,
    name: String,
}

#[derive(Debug, Serialize)]
struct SegmentCreate<'a> {
    name: &'a str,
    static_segment: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SegmentMemberAdd<'a> {
    email_address: &'a str,
}

#[derive(Debug, Serialize)]
struct CampaignCreate<'a> {
    #[serde(rename = "type")]
    campaign_type: &'static str,
    recipients: CampaignRecipients<'a>,
    settings: CampaignSettings<'a>,
}

#[derive(Debug, Serialize)]
struct CampaignRecipients<'a> {
    list_id: &'a str,
}

#[derive(Debug, Serialize)]
struct CampaignSettings<'a> {
    subject_line: &'a str,
    title: &'a str,
}

#[derive(Debug, Deserialize)]
struct Campaign {
    id: String,
}

#[derive(Debug, Serialize)]
struct CampaignContent<'a> {
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct ActivityResponse {
    activity: Vec<DayActivity>,
}

#[derive(Debug, Deserialize)]
struct DayActivity {
    day: String,
    #[serde(default)]
    emails_sent: u64,
    #[serde(default)]
    unique_opens: u64,
    #[serde(default)]
    recipient_clicks: u64,
    #[serde(default)]
    subs: u64,
    #[serde(default)]
    unsubs: u64,
}
