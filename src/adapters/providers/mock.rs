//! Mock ESP provider for testing.
//!
//! A stateful, configurable implementation of the `EspProvider` port:
//! contacts, list memberships, and tags live in memory, every mutation is
//! recorded for verification, and any operation can be made to fail.
//!
//! # Example
//!
//! ```ignore
//! let provider = MockEspProvider::new(ProviderKind::Mailchimp)
//!     .with_op_failure(MockOp::Send, EspError::api("500", "down"));
//! provider.seed_contact_on_lists(&email, &["L1"]);
//! ```

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

use crate::domain::contact::{Contact, EmailAddress};
use crate::domain::foundation::NewsletterId;
use crate::domain::lists::{NativeListId, TagId};
use crate::domain::provider::ProviderKind;
use crate::domain::reporting::UsageReport;
use crate::ports::{
    ApiCredentials, EspContact, EspError, EspProvider, ProviderList, SendRequest,
};

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    GetContact,
    AddContact,
    UpdateContactLists,
    ContactLists,
    AddTag,
    RemoveTag,
    ContactTagIds,
    GetLists,
    Send,
    UsageReport,
}

/// A recorded mutation, for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    AddContact {
        email: EmailAddress,
        list: NativeListId,
    },
    UpdateContactLists {
        email: EmailAddress,
        to_add: Vec<NativeListId>,
        to_remove: Vec<NativeListId>,
    },
    AddTag {
        email: EmailAddress,
        tag: TagId,
        list: NativeListId,
    },
    RemoveTag {
        email: EmailAddress,
        tag: TagId,
        list: NativeListId,
    },
    Send {
        newsletter_id: NewsletterId,
    },
}

#[derive(Debug, Clone, Default)]
struct ContactState {
    name: Option<String>,
    metadata: HashMap<String, String>,
    lists: BTreeSet<NativeListId>,
    /// Tags are scoped to their owning list, as Mailchimp scopes them.
    tags: BTreeMap<NativeListId, BTreeSet<TagId>>,
}

/// Mock ESP provider.
pub struct MockEspProvider {
    kind: ProviderKind,
    supports_local_lists: bool,
    has_credentials: Mutex<bool>,
    lists: Vec<ProviderList>,
    usage: Option<UsageReport>,
    failures: HashMap<MockOp, EspError>,
    contacts: Mutex<HashMap<EmailAddress, ContactState>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockEspProvider {
    /// Creates a mock provider with credentials present and local-list
    /// support on.
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            supports_local_lists: true,
            has_credentials: Mutex::new(true),
            lists: Vec::new(),
            usage: None,
            failures: HashMap::new(),
            contacts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Toggles local-list (tag) support.
    pub fn with_local_list_support(mut self, supported: bool) -> Self {
        self.supports_local_lists = supported;
        self
    }

    /// Starts with no stored credentials.
    pub fn without_credentials(self) -> Self {
        *self.has_credentials.lock().unwrap() = false;
        self
    }

    /// Makes every call to `op` fail with `error`.
    pub fn with_op_failure(mut self, op: MockOp, error: EspError) -> Self {
        self.failures.insert(op, error);
        self
    }

    /// Seeds the provider's native lists.
    pub fn with_provider_lists(mut self, lists: Vec<ProviderList>) -> Self {
        self.lists = lists;
        self
    }

    /// Seeds the usage report.
    pub fn with_usage_report(mut self, report: UsageReport) -> Self {
        self.usage = Some(report);
        self
    }

    /// Seeds a contact as existing on the given lists (possibly none).
    pub fn seed_contact_on_lists(&self, email: &EmailAddress, lists: &[&str]) {
        let mut contacts = self.contacts.lock().unwrap();
        let state = contacts.entry(email.clone()).or_default();
        for list in lists {
            state.lists.insert(NativeListId::new(*list));
        }
    }

    /// Seeds a tag on a contact, scoped to a list.
    pub fn seed_contact_tag(&self, email: &EmailAddress, list: &str, tag: &str) {
        let mut contacts = self.contacts.lock().unwrap();
        let state = contacts.entry(email.clone()).or_default();
        state
            .tags
            .entry(NativeListId::new(list))
            .or_default()
            .insert(TagId::new(tag));
    }

    /// Every recorded mutation, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    /// A contact's current native lists, sorted.
    pub fn contact_lists_snapshot(&self, email: &EmailAddress) -> Vec<NativeListId> {
        self.contacts
            .lock()
            .unwrap()
            .get(email)
            .map(|s| s.lists.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// A contact's current tags across all lists, sorted.
    pub fn contact_tags_snapshot(&self, email: &EmailAddress) -> Vec<TagId> {
        self.contacts
            .lock()
            .unwrap()
            .get(email)
            .map(|s| {
                let mut tags: Vec<TagId> =
                    s.tags.values().flatten().cloned().collect();
                tags.sort_by(|a, b| a.as_str().cmp(b.as_str()));
                tags.dedup();
                tags
            })
            .unwrap_or_default()
    }

    fn check_failure(&self, op: MockOp) -> Result<(), EspError> {
        match self.failures.get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl EspProvider for MockEspProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn supports_local_lists(&self) -> bool {
        self.supports_local_lists
    }

    fn has_api_credentials(&self) -> bool {
        *self.has_credentials.lock().unwrap()
    }

    fn set_api_credentials(&self, credentials: ApiCredentials) -> Result<(), EspError> {
        let missing = credentials.missing_fields(&["api_key"]);
        if !missing.is_empty() {
            return Err(EspError::invalid_credentials(missing));
        }
        *self.has_credentials.lock().unwrap() = true;
        Ok(())
    }

    async fn get_lists(&self) -> Result<Vec<ProviderList>, EspError> {
        self.check_failure(MockOp::GetLists)?;
        Ok(self.lists.clone())
    }

    async fn get_contact(&self, email: &EmailAddress) -> Result<Option<EspContact>, EspError> {
        self.check_failure(MockOp::GetContact)?;
        let contacts = self.contacts.lock().unwrap();
        Ok(contacts.get(email).map(|state| EspContact {
            email: email.clone(),
            name: state.name.clone(),
            metadata: state.metadata.clone(),
        }))
    }

    async fn add_contact(
        &self,
        contact: &Contact,
        list: &NativeListId,
    ) -> Result<EspContact, EspError> {
        self.check_failure(MockOp::AddContact)?;
        self.record(MockCall::AddContact {
            email: contact.email.clone(),
            list: list.clone(),
        });
        let mut contacts = self.contacts.lock().unwrap();
        let state = contacts.entry(contact.email.clone()).or_default();
        if contact.name.is_some() {
            state.name = contact.name.clone();
        }
        state.metadata.extend(contact.metadata.clone());
        state.lists.insert(list.clone());
        Ok(EspContact {
            email: contact.email.clone(),
            name: state.name.clone(),
            metadata: state.metadata.clone(),
        })
    }

    async fn update_contact_lists(
        &self,
        email: &EmailAddress,
        to_add: &[NativeListId],
        to_remove: &[NativeListId],
    ) -> Result<(), EspError> {
        self.check_failure(MockOp::UpdateContactLists)?;
        self.record(MockCall::UpdateContactLists {
            email: email.clone(),
            to_add: to_add.to_vec(),
            to_remove: to_remove.to_vec(),
        });
        let mut contacts = self.contacts.lock().unwrap();
        let state = contacts.entry(email.clone()).or_default();
        for list in to_add {
            state.lists.insert(list.clone());
        }
        for list in to_remove {
            state.lists.remove(list);
            // Leaving a list drops the tags scoped to it.
            state.tags.remove(list);
        }
        Ok(())
    }

    async fn contact_lists(&self, email: &EmailAddress) -> Result<Vec<NativeListId>, EspError> {
        self.check_failure(MockOp::ContactLists)?;
        Ok(self.contact_lists_snapshot(email))
    }

    async fn get_tag_id(
        &self,
        name: &str,
        _create_if_missing: bool,
        _list: &NativeListId,
    ) -> Result<TagId, EspError> {
        // Mock tag ids are their names.
        Ok(TagId::new(name))
    }

    async fn create_tag(&self, name: &str, _list: &NativeListId) -> Result<TagId, EspError> {
        Ok(TagId::new(name))
    }

    async fn add_tag_to_contact(
        &self,
        email: &EmailAddress,
        tag: &TagId,
        list: &NativeListId,
    ) -> Result<(), EspError> {
        self.check_failure(MockOp::AddTag)?;
        self.record(MockCall::AddTag {
            email: email.clone(),
            tag: tag.clone(),
            list: list.clone(),
        });
        let mut contacts = self.contacts.lock().unwrap();
        let state = contacts.entry(email.clone()).or_default();
        // Tagging implies membership on the owning list.
        state.lists.insert(list.clone());
        state.tags.entry(list.clone()).or_default().insert(tag.clone());
        Ok(())
    }

    async fn remove_tag_from_contact(
        &self,
        email: &EmailAddress,
        tag: &TagId,
        list: &NativeListId,
    ) -> Result<(), EspError> {
        self.check_failure(MockOp::RemoveTag)?;
        self.record(MockCall::RemoveTag {
            email: email.clone(),
            tag: tag.clone(),
            list: list.clone(),
        });
        let mut contacts = self.contacts.lock().unwrap();
        let state = contacts
            .get_mut(email)
            .ok_or_else(|| EspError::contact_not_found(email))?;
        if let Some(tags) = state.tags.get_mut(list) {
            tags.remove(tag);
        }
        Ok(())
    }

    async fn contact_tag_ids(&self, email: &EmailAddress) -> Result<Vec<TagId>, EspError> {
        self.check_failure(MockOp::ContactTagIds)?;
        Ok(self.contact_tags_snapshot(email))
    }

    async fn send(&self, request: &SendRequest) -> Result<(), EspError> {
        self.check_failure(MockOp::Send)?;
        self.record(MockCall::Send {
            newsletter_id: request.newsletter_id,
        });
        Ok(())
    }

    async fn usage_report(&self) -> Result<UsageReport, EspError> {
        self.check_failure(MockOp::UsageReport)?;
        Ok(self.usage.clone().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(raw: &str) -> EmailAddress {
        EmailAddress::new(raw).unwrap()
    }

    #[tokio::test]
    async fn add_contact_is_idempotent() {
        let provider = MockEspProvider::new(ProviderKind::Mailchimp);
        let contact = Contact::new(email("reader@example.com"));
        let list = NativeListId::new("L1");

        provider.add_contact(&contact, &list).await.unwrap();
        provider.add_contact(&contact, &list).await.unwrap();

        assert_eq!(provider.contact_lists_snapshot(&contact.email), vec![list]);
    }

    #[tokio::test]
    async fn leaving_a_list_drops_its_tags() {
        let provider = MockEspProvider::new(ProviderKind::Mailchimp);
        let reader = email("reader@example.com");
        provider.seed_contact_on_lists(&reader, &["L1"]);
        provider.seed_contact_tag(&reader, "L1", "T1");

        provider
            .update_contact_lists(&reader, &[], &[NativeListId::new("L1")])
            .await
            .unwrap();

        assert!(provider.contact_tags_snapshot(&reader).is_empty());
    }

    #[tokio::test]
    async fn injected_failures_surface() {
        let provider = MockEspProvider::new(ProviderKind::Mailchimp)
            .with_op_failure(MockOp::GetContact, EspError::AuthenticationFailed);

        let result = provider.get_contact(&email("reader@example.com")).await;
        assert_eq!(result, Err(EspError::AuthenticationFailed));
    }

    #[tokio::test]
    async fn credentials_shape_is_validated() {
        let provider = MockEspProvider::new(ProviderKind::Mailchimp).without_credentials();
        assert!(!provider.has_api_credentials());

        let err = provider
            .set_api_credentials(ApiCredentials::new().with_field("api_key", ""))
            .unwrap_err();
        assert_eq!(err, EspError::invalid_credentials(vec!["api_key"]));
        assert!(!provider.has_api_credentials());

        provider
            .set_api_credentials(ApiCredentials::new().with_field("api_key", "k"))
            .unwrap();
        assert!(provider.has_api_credentials());
    }
}
