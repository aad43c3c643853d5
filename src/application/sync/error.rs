//! Sync error taxonomy.

use crate::domain::lists::FormId;
use crate::domain::provider::ProviderKind;
use crate::ports::{EspError, RegistryError};

/// Errors surfaced by the contact sync engine and its callers.
///
/// Configuration problems are surfaced immediately and never retried;
/// provider errors carry the ESP boundary's typed failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// A local list exists but has no complete settings entry for the
    /// active provider.
    #[error("subscription list '{form_id}' is not configured for provider '{provider}'")]
    ListNotConfigured {
        form_id: FormId,
        provider: ProviderKind,
    },

    /// Contact sync is switched off for this environment.
    #[error("contact sync is disabled for this environment")]
    SyncDisabled,

    /// Commerce contact sync needs a configured audience list.
    #[error("no audience list is configured for provider '{provider}'")]
    NoAudienceConfigured { provider: ProviderKind },

    /// Local list lookup failed (unknown form id or storage failure).
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The ESP boundary failed.
    #[error(transparent)]
    Provider(#[from] EspError),
}

impl SyncError {
    /// True for errors a configuration change (not a retry) fixes.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SyncError::ListNotConfigured { .. }
                | SyncError::SyncDisabled
                | SyncError::NoAudienceConfigured { .. }
                | SyncError::Provider(EspError::MissingCredentials)
                | SyncError::Provider(EspError::InvalidCredentials { .. })
        )
    }
}
