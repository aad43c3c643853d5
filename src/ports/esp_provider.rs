//! ESP Provider Port - the contract every email service provider
//! integration implements.
//!
//! The sync engine, membership bridge, resync driver, and send gate all
//! speak to the active provider through this trait and never to a vendor
//! API directly. Adapters translate between the vendor's wire format and
//! these types, and convert every transport or API failure into an
//! [`EspError`]; raw HTTP errors never cross this boundary.
//!
//! # Local-list emulation
//!
//! Providers with no native concept of manually curated, overlapping lists
//! emulate site-owned ("local") lists with tags. Such providers return
//! `true` from [`EspProvider::supports_local_lists`] and implement the tag
//! primitives; for everyone else the primitives keep their default
//! implementation, a uniform [`EspError::NotSupported`]: a static,
//! predictable response, never a runtime surprise.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::contact::{Contact, EmailAddress};
use crate::domain::foundation::NewsletterId;
use crate::domain::lists::{NativeListId, TagId};
use crate::domain::provider::ProviderKind;
use crate::domain::reporting::UsageReport;

/// Port for ESP interactions.
#[async_trait]
pub trait EspProvider: Send + Sync {
    /// Which provider this is.
    fn kind(&self) -> ProviderKind;

    /// Whether this provider emulates local lists via tags.
    ///
    /// Callers must check this before invoking any tag primitive; when it
    /// is false the provider's native list mechanism is the only source
    /// of truth.
    fn supports_local_lists(&self) -> bool {
        false
    }

    /// Pure check of locally stored credentials' presence. No network.
    fn has_api_credentials(&self) -> bool;

    /// Validates credential shape and stores the credentials.
    ///
    /// Fails fast with [`EspError::InvalidCredentials`] naming the missing
    /// field(s); nothing is persisted on failure.
    fn set_api_credentials(&self, credentials: ApiCredentials) -> Result<(), EspError>;

    /// The provider's native lists/audiences. Cached in-process per
    /// adapter; a second call within one invocation must not hit the
    /// network.
    async fn get_lists(&self) -> Result<Vec<ProviderList>, EspError>;

    /// The provider's native segments, where the concept exists.
    async fn get_segments(&self) -> Result<Vec<ProviderSegment>, EspError> {
        Err(EspError::not_supported(self.kind(), "get_segments"))
    }

    /// Looks up a contact by email. `None` means the contact does not
    /// exist in the provider's system yet.
    async fn get_contact(&self, email: &EmailAddress) -> Result<Option<EspContact>, EspError>;

    /// Upserts a contact's presence on a single provider-native list.
    ///
    /// Safe to call repeatedly: a second add with the same list yields the
    /// same final membership state, not a duplicate entry.
    async fn add_contact(
        &self,
        contact: &Contact,
        list: &NativeListId,
    ) -> Result<EspContact, EspError>;

    /// Bulk add/remove against provider-native lists only. Local-list
    /// resolution is the sync engine's job and has already happened by
    /// the time this is called.
    async fn update_contact_lists(
        &self,
        email: &EmailAddress,
        to_add: &[NativeListId],
        to_remove: &[NativeListId],
    ) -> Result<(), EspError>;

    /// The native lists a contact is currently on.
    async fn contact_lists(&self, email: &EmailAddress) -> Result<Vec<NativeListId>, EspError>;

    /// Resolves a tag name to its id, optionally creating it.
    async fn get_tag_id(
        &self,
        _name: &str,
        _create_if_missing: bool,
        _list: &NativeListId,
    ) -> Result<TagId, EspError> {
        Err(EspError::not_supported(self.kind(), "get_tag_id"))
    }

    /// Creates a tag on a list.
    async fn create_tag(&self, _name: &str, _list: &NativeListId) -> Result<TagId, EspError> {
        Err(EspError::not_supported(self.kind(), "create_tag"))
    }

    /// Applies a tag to a contact.
    async fn add_tag_to_contact(
        &self,
        _email: &EmailAddress,
        _tag: &TagId,
        _list: &NativeListId,
    ) -> Result<(), EspError> {
        Err(EspError::not_supported(self.kind(), "add_tag_to_contact"))
    }

    /// Removes a tag from a contact.
    async fn remove_tag_from_contact(
        &self,
        _email: &EmailAddress,
        _tag: &TagId,
        _list: &NativeListId,
    ) -> Result<(), EspError> {
        Err(EspError::not_supported(self.kind(), "remove_tag_from_contact"))
    }

    /// The tag ids currently applied to a contact.
    async fn contact_tag_ids(&self, _email: &EmailAddress) -> Result<Vec<TagId>, EspError> {
        Err(EspError::not_supported(self.kind(), "contact_tag_ids"))
    }

    /// Triggers delivery of a newsletter to its resolved audience.
    ///
    /// At-most-once per newsletter is enforced by the send gate, not here.
    async fn send(&self, request: &SendRequest) -> Result<(), EspError>;

    /// Activity counters for the most recent reporting period.
    async fn usage_report(&self) -> Result<UsageReport, EspError> {
        Err(EspError::not_supported(self.kind(), "usage_report"))
    }
}

/// Credentials as supplied by configuration or the admin surface.
///
/// A flat field map keeps the port uniform across providers; each adapter
/// names the fields it requires and validates their presence in
/// [`EspProvider::set_api_credentials`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiCredentials {
    fields: HashMap<String, String>,
}

impl ApiCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a credential field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// A field's value, if present and non-empty.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Returns the names from `required` that are missing or empty.
    pub fn missing_fields(&self, required: &[&'static str]) -> Vec<&'static str> {
        required
            .iter()
            .copied()
            .filter(|name| self.get(name).is_none())
            .collect()
    }
}

/// A native list/audience in the provider's data model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderList {
    pub id: NativeListId,
    pub name: String,
    pub member_count: Option<u64>,
}

/// A native segment in the provider's data model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSegment {
    pub id: String,
    pub name: String,
}

/// A contact as the provider knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EspContact {
    pub email: EmailAddress,
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl EspContact {
    pub fn new(email: EmailAddress) -> Self {
        Self {
            email,
            name: None,
            metadata: HashMap::new(),
        }
    }
}

/// What the provider needs to deliver one newsletter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequest {
    pub newsletter_id: NewsletterId,
    pub subject: String,
    pub html: String,
    /// Public URL of the rendered newsletter, for providers that ingest
    /// hosted HTML instead of a raw body.
    pub html_url: Option<String>,
    /// Target list; `None` lets the provider use its configured default
    /// audience.
    pub list: Option<NativeListId>,
}

/// ESP boundary errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EspError {
    /// Credential shape validation failed.
    #[error("invalid API credentials: missing {missing:?}")]
    InvalidCredentials {
        /// Names of the missing/empty required fields.
        missing: Vec<&'static str>,
    },

    /// No credentials are configured at all.
    #[error("API credentials are not configured")]
    MissingCredentials,

    /// The provider rejected our credentials.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Rate limited by the provider.
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until retry is allowed.
        retry_after_secs: u32,
    },

    /// Transient network failure.
    #[error("network error: {0}")]
    Network(String),

    /// The HTTP call exceeded the client timeout.
    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The provider's response could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// The provider rejected or failed the request.
    #[error("provider error [{code}]: {message}")]
    Api { code: String, message: String },

    /// A referenced native list does not exist.
    #[error("list '{list_id}' not found")]
    ListNotFound { list_id: String },

    /// A referenced contact does not exist.
    #[error("contact '{email}' not found")]
    ContactNotFound { email: String },

    /// The provider does not support this operation.
    #[error("{provider} does not support {operation}")]
    NotSupported {
        provider: &'static str,
        operation: &'static str,
    },
}

impl EspError {
    /// Creates an invalid-credentials error naming the missing fields.
    pub fn invalid_credentials(missing: Vec<&'static str>) -> Self {
        EspError::InvalidCredentials { missing }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        EspError::Network(message.into())
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        EspError::Parse(message.into())
    }

    /// Creates a provider API error.
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        EspError::Api {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a list-not-found error.
    pub fn list_not_found(list_id: impl Into<String>) -> Self {
        EspError::ListNotFound {
            list_id: list_id.into(),
        }
    }

    /// Creates a contact-not-found error.
    pub fn contact_not_found(email: &EmailAddress) -> Self {
        EspError::ContactNotFound {
            email: email.to_string(),
        }
    }

    /// Creates a not-supported error.
    pub fn not_supported(provider: ProviderKind, operation: &'static str) -> Self {
        EspError::NotSupported {
            provider: provider.as_str(),
            operation,
        }
    }

    /// True for failures where a manual retry may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EspError::RateLimited { .. } | EspError::Network(_) | EspError::Timeout { .. }
        )
    }
}
