//! Newsletter Store Port - send markers, error logs, test-email prefs.

use async_trait::async_trait;

use crate::domain::contact::EmailAddress;
use crate::domain::foundation::{NewsletterId, UserId};
use crate::domain::newsletter::SendErrorEntry;

/// Persistence for per-newsletter send state and per-user test-email
/// preferences.
#[async_trait]
pub trait NewsletterStore: Send + Sync {
    /// Whether the newsletter has already been sent.
    async fn is_sent(&self, id: NewsletterId) -> Result<bool, NewsletterStoreError>;

    /// Records that the newsletter was sent. Idempotent.
    async fn mark_sent(&self, id: NewsletterId) -> Result<(), NewsletterStoreError>;

    /// Appends a send failure; implementations keep only the most recent
    /// [`crate::domain::newsletter::SEND_ERROR_LOG_CAPACITY`] entries.
    async fn record_send_error(
        &self,
        id: NewsletterId,
        entry: SendErrorEntry,
    ) -> Result<(), NewsletterStoreError>;

    /// The retained send failures, oldest first.
    async fn send_errors(&self, id: NewsletterId)
        -> Result<Vec<SendErrorEntry>, NewsletterStoreError>;

    /// A user's preferred test recipient addresses.
    async fn test_emails(&self, user_id: UserId)
        -> Result<Vec<EmailAddress>, NewsletterStoreError>;

    /// Replaces a user's test recipient addresses.
    async fn set_test_emails(
        &self,
        user_id: UserId,
        emails: Vec<EmailAddress>,
    ) -> Result<(), NewsletterStoreError>;
}

/// Newsletter persistence errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("newsletter storage error: {0}")]
pub struct NewsletterStoreError(pub String);

impl NewsletterStoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
