//! Contact Sync Engine - the core list membership mutation logic.
//!
//! Given a contact (or email) and list targets that may be local or
//! provider-native, the engine resolves local lists through the registry,
//! performs tag-based local-list bookkeeping, and calls the active
//! provider to mutate the contact's memberships. Providers never receive
//! a local identifier.
//!
//! Within one operation, tag mutations execute strictly before the final
//! native-list batch call, in list-array iteration order. There is no
//! rollback: each mutation commits independently, and the first failure
//! short-circuits the rest.

use std::sync::Arc;

use crate::domain::contact::{Contact, EmailAddress};
use crate::domain::lists::{FormId, ListTarget, NativeListId, ProviderListSettings};
use crate::domain::provider::ProviderKind;
use crate::ports::{EspContact, EspError, EspProvider, ListRegistry};

use super::context::SyncContext;
use super::error::SyncError;

/// Whether a local-list operation adds or removes membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListAction {
    Add,
    Remove,
}

/// The core sync service.
///
/// The active provider and the list registry are injected at
/// construction; nothing is looked up ambiently.
pub struct ContactSyncEngine {
    provider: Arc<dyn EspProvider>,
    registry: Arc<dyn ListRegistry>,
    /// Default audience for commerce-driven contact sync.
    audience: Option<NativeListId>,
    /// The "can sync at all" capability gate for commerce-driven sync.
    commerce_sync_enabled: bool,
}

impl ContactSyncEngine {
    pub fn new(provider: Arc<dyn EspProvider>, registry: Arc<dyn ListRegistry>) -> Self {
        Self {
            provider,
            registry,
            audience: None,
            commerce_sync_enabled: true,
        }
    }

    /// Sets the audience list commerce contact sync targets.
    pub fn with_audience(mut self, audience: NativeListId) -> Self {
        self.audience = Some(audience);
        self
    }

    /// Enables or disables commerce-driven contact sync.
    pub fn with_commerce_sync_enabled(mut self, enabled: bool) -> Self {
        self.commerce_sync_enabled = enabled;
        self
    }

    /// The active provider's kind.
    pub fn provider_kind(&self) -> ProviderKind {
        self.provider.kind()
    }

    /// The capability gate for commerce-driven sync: feature enabled and
    /// provider credentials present.
    pub fn can_sync(&self) -> Result<(), SyncError> {
        if !self.commerce_sync_enabled {
            return Err(SyncError::SyncDisabled);
        }
        if !self.provider.has_api_credentials() {
            return Err(SyncError::Provider(EspError::MissingCredentials));
        }
        Ok(())
    }

    /// Adds a contact to one list, local or provider-native.
    ///
    /// A local target resolves to its provider wiring first; after a
    /// successful native add, tag bookkeeping runs when the provider
    /// supports local lists. A tagging failure after a successful native
    /// add is still reported as an error: the local-list bookkeeping is
    /// part of the contract.
    pub async fn add_contact_handling_local(
        &self,
        ctx: &SyncContext,
        contact: &Contact,
        target: &ListTarget,
    ) -> Result<EspContact, SyncError> {
        match target {
            ListTarget::Local(form_id) => {
                let settings = self.resolve_settings(*form_id).await?;
                let result = self.provider.add_contact(contact, &settings.list).await?;
                if self.provider.supports_local_lists() {
                    self.provider
                        .add_tag_to_contact(&contact.email, &settings.tag_id, &settings.list)
                        .await?;
                }
                tracing::info!(
                    "[{}] added {} to local list {} (list {}, tag {})",
                    ctx.request_id,
                    contact.email,
                    form_id,
                    settings.list,
                    settings.tag_id
                );
                Ok(result)
            }
            ListTarget::Native(list_id) => {
                let result = self.provider.add_contact(contact, list_id).await?;
                tracing::info!(
                    "[{}] added {} to native list {}",
                    ctx.request_id,
                    contact.email,
                    list_id
                );
                Ok(result)
            }
        }
    }

    /// Applies a batch of membership changes, handling local lists.
    ///
    /// A contact unknown to the provider is treated as a fresh signup:
    /// every add target goes through [`Self::add_contact_handling_local`]
    /// and no removal bookkeeping is attempted. For an existing contact,
    /// local targets are handled as tag side effects and only the
    /// provider-native remainder reaches the provider's batch call.
    pub async fn update_contact_lists_handling_local(
        &self,
        ctx: &SyncContext,
        email: &EmailAddress,
        lists_to_add: Vec<ListTarget>,
        lists_to_remove: Vec<ListTarget>,
    ) -> Result<(), SyncError> {
        let existing = self.provider.get_contact(email).await?;

        if existing.is_none() {
            tracing::info!(
                "[{}] {} is a fresh signup; adding to {} list(s)",
                ctx.request_id,
                email,
                lists_to_add.len()
            );
            let contact = Contact::new(email.clone());
            for target in &lists_to_add {
                self.add_contact_handling_local(ctx, &contact, target).await?;
            }
            return Ok(());
        }

        let (native_add, native_remove) = if self.provider.supports_local_lists() {
            let add = self
                .update_contact_local_lists(ctx, email, lists_to_add, ListAction::Add)
                .await?;
            let remove = self
                .update_contact_local_lists(ctx, email, lists_to_remove, ListAction::Remove)
                .await?;
            (add, remove)
        } else {
            // No tag emulation: local lists fall back to membership on
            // their configured backing list.
            let add = self.resolve_to_native(lists_to_add).await?;
            let remove = self.resolve_to_native(lists_to_remove).await?;
            (add, remove)
        };

        if native_add.is_empty() && native_remove.is_empty() {
            return Ok(());
        }

        self.provider
            .update_contact_lists(email, &native_add, &native_remove)
            .await?;
        tracing::info!(
            "[{}] updated native lists for {}: +{:?} -{:?}",
            ctx.request_id,
            email,
            native_add,
            native_remove
        );
        Ok(())
    }

    /// Performs the tag action for each local target and returns the
    /// provider-native remainder, in iteration order.
    ///
    /// The return value is what still needs native-list handling. Fails
    /// fast on the first unknown or unconfigured local list.
    pub async fn update_contact_local_lists(
        &self,
        ctx: &SyncContext,
        email: &EmailAddress,
        targets: Vec<ListTarget>,
        action: ListAction,
    ) -> Result<Vec<NativeListId>, SyncError> {
        let mut remaining = Vec::new();
        for target in targets {
            match target {
                ListTarget::Native(list_id) => remaining.push(list_id),
                ListTarget::Local(form_id) => {
                    let settings = self.resolve_settings(form_id).await?;
                    match action {
                        ListAction::Add => {
                            self.provider
                                .add_tag_to_contact(email, &settings.tag_id, &settings.list)
                                .await?;
                        }
                        ListAction::Remove => {
                            self.provider
                                .remove_tag_from_contact(email, &settings.tag_id, &settings.list)
                                .await?;
                        }
                    }
                    tracing::debug!(
                        "[{}] {:?} tag {} for {} on list {}",
                        ctx.request_id,
                        action,
                        settings.tag_id,
                        email,
                        settings.list
                    );
                }
            }
        }
        Ok(remaining)
    }

    /// The local lists a contact is on, reverse-mapped from provider tags.
    ///
    /// A provider tag with no matching configured local list is silently
    /// ignored; not every tag corresponds to a local list.
    pub async fn get_contact_local_lists(
        &self,
        _ctx: &SyncContext,
        email: &EmailAddress,
    ) -> Result<Vec<FormId>, SyncError> {
        if !self.provider.supports_local_lists() {
            return Ok(Vec::new());
        }
        let tags = self.provider.contact_tag_ids(email).await?;
        if tags.is_empty() {
            return Ok(Vec::new());
        }
        let kind = self.provider.kind();
        let configured = self.registry.configured_for_provider(kind).await?;
        let mut lists = Vec::new();
        for list in configured {
            if let Some(settings) = list.provider_settings(kind) {
                if tags.contains(&settings.tag_id) {
                    lists.push(list.form_id);
                }
            }
        }
        Ok(lists)
    }

    /// Everything the contact is currently subscribed to: native list
    /// memberships plus resolved local lists.
    ///
    /// The single source of truth consumers use to avoid re-adding a
    /// contact to a list they are already on.
    pub async fn get_contact_combined_lists(
        &self,
        ctx: &SyncContext,
        email: &EmailAddress,
    ) -> Result<Vec<ListTarget>, SyncError> {
        let mut combined: Vec<ListTarget> = self
            .provider
            .contact_lists(email)
            .await?
            .into_iter()
            .map(ListTarget::Native)
            .collect();
        for form_id in self.get_contact_local_lists(ctx, email).await? {
            let target = ListTarget::Local(form_id);
            if !combined.contains(&target) {
                combined.push(target);
            }
        }
        Ok(combined)
    }

    /// Upserts commerce-derived contact data to the configured audience.
    ///
    /// Checked against the capability gate on every call; bulk callers
    /// also check the gate once up front.
    pub async fn sync_contact(
        &self,
        ctx: &SyncContext,
        contact: &Contact,
    ) -> Result<EspContact, SyncError> {
        self.can_sync()?;
        let audience = self.audience.as_ref().ok_or(SyncError::NoAudienceConfigured {
            provider: self.provider.kind(),
        })?;
        let result = self.provider.add_contact(contact, audience).await?;
        tracing::info!(
            "[{}] synced commerce contact {} to audience {}",
            ctx.request_id,
            contact.email,
            audience
        );
        Ok(result)
    }

    /// Resolves a local list's provider wiring, failing with a
    /// configuration error when the list is not set up for the active
    /// provider.
    async fn resolve_settings(&self, form_id: FormId) -> Result<ProviderListSettings, SyncError> {
        let kind = self.provider.kind();
        let list = self.registry.resolve(form_id).await?;
        list.provider_settings(kind)
            .cloned()
            .ok_or(SyncError::ListNotConfigured {
                form_id,
                provider: kind,
            })
    }

    /// Maps mixed targets to native ids for providers without tag
    /// emulation. Local lists resolve to their backing native list.
    async fn resolve_to_native(
        &self,
        targets: Vec<ListTarget>,
    ) -> Result<Vec<NativeListId>, SyncError> {
        let mut native = Vec::new();
        for target in targets {
            match target {
                ListTarget::Native(list_id) => native.push(list_id),
                ListTarget::Local(form_id) => {
                    let settings = self.resolve_settings(form_id).await?;
                    native.push(settings.list);
                }
            }
        }
        Ok(native)
    }
}
