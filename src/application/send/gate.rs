//! Post-status/send gate.
//!
//! A newsletter is sent at most once. The persisted sent marker is
//! checked before the provider call and written immediately after a
//! successful one; failures land in the newsletter's bounded error log
//! and move the status back to queued.

use std::sync::Arc;

use crate::domain::foundation::StateMachine;
use crate::domain::newsletter::{Newsletter, NewsletterStatus, SendErrorEntry};
use crate::ports::{EspError, EspProvider, NewsletterStore, NewsletterStoreError, SendRequest};

/// Send gate errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// The newsletter was already sent; sending again is refused.
    #[error("newsletter {newsletter_id} was already sent")]
    AlreadySent { newsletter_id: u64 },

    /// The newsletter's status does not permit sending.
    #[error("newsletter {newsletter_id} is {status:?}, not sendable")]
    NotSendable {
        newsletter_id: u64,
        status: NewsletterStatus,
    },

    /// The provider refused or failed the send. Recorded in the error log.
    #[error(transparent)]
    Provider(#[from] EspError),

    #[error(transparent)]
    Store(#[from] NewsletterStoreError),
}

/// Enforces at-most-once delivery per newsletter.
pub struct SendGate {
    provider: Arc<dyn EspProvider>,
    store: Arc<dyn NewsletterStore>,
}

impl SendGate {
    pub fn new(provider: Arc<dyn EspProvider>, store: Arc<dyn NewsletterStore>) -> Self {
        Self { provider, store }
    }

    /// Sends a newsletter through the active provider, at most once.
    ///
    /// Returns the newsletter's final status. The caller persists status
    /// transitions; this gate owns the sent marker and the error log.
    pub async fn send(
        &self,
        newsletter: &Newsletter,
        html: String,
    ) -> Result<NewsletterStatus, SendError> {
        if self.store.is_sent(newsletter.id).await? {
            return Err(SendError::AlreadySent {
                newsletter_id: newsletter.id.as_u64(),
            });
        }
        // Queued → Sending must be a legal transition; Draft and Sent
        // newsletters are refused up front.
        newsletter
            .status
            .transition_to(NewsletterStatus::Sending)
            .map_err(|_| SendError::NotSendable {
                newsletter_id: newsletter.id.as_u64(),
                status: newsletter.status,
            })?;

        let request = SendRequest {
            newsletter_id: newsletter.id,
            subject: newsletter.subject.clone(),
            html,
            html_url: None,
            list: None,
        };

        match self.provider.send(&request).await {
            Ok(()) => {
                self.store.mark_sent(newsletter.id).await?;
                tracing::info!("newsletter {} sent", newsletter.id);
                Ok(NewsletterStatus::Sent)
            }
            Err(err) => {
                let entry = SendErrorEntry::new(err.to_string());
                if let Err(store_err) = self.store.record_send_error(newsletter.id, entry).await {
                    tracing::error!(
                        "failed to record send error for newsletter {}: {}",
                        newsletter.id,
                        store_err
                    );
                }
                tracing::error!("newsletter {} send failed: {}", newsletter.id, err);
                Err(SendError::Provider(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryNewsletterStore;
    use crate::adapters::providers::{MockCall, MockEspProvider, MockOp};
    use crate::domain::foundation::NewsletterId;
    use crate::domain::provider::ProviderKind;

    fn queued_newsletter(id: u64) -> Newsletter {
        let mut newsletter = Newsletter::new(NewsletterId::new(id), "Morning Edition");
        newsletter.status = NewsletterStatus::Queued;
        newsletter
    }

    #[tokio::test]
    async fn sends_once_and_marks_sent() {
        let provider = Arc::new(MockEspProvider::new(ProviderKind::Mailchimp));
        let store = Arc::new(InMemoryNewsletterStore::new());
        let gate = SendGate::new(provider.clone(), store.clone());
        let newsletter = queued_newsletter(9);

        let status = gate.send(&newsletter, "<p>hi</p>".into()).await.unwrap();

        assert_eq!(status, NewsletterStatus::Sent);
        assert!(store.is_sent(newsletter.id).await.unwrap());
        assert_eq!(
            provider
                .calls()
                .iter()
                .filter(|c| matches!(c, MockCall::Send { .. }))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn second_send_is_refused() {
        let provider = Arc::new(MockEspProvider::new(ProviderKind::Mailchimp));
        let store = Arc::new(InMemoryNewsletterStore::new());
        let gate = SendGate::new(provider.clone(), store.clone());
        let newsletter = queued_newsletter(9);

        gate.send(&newsletter, "<p>hi</p>".into()).await.unwrap();
        let second = gate.send(&newsletter, "<p>hi</p>".into()).await;

        assert_eq!(
            second,
            Err(SendError::AlreadySent { newsletter_id: 9 })
        );
        assert_eq!(
            provider
                .calls()
                .iter()
                .filter(|c| matches!(c, MockCall::Send { .. }))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn draft_newsletter_is_not_sendable() {
        let provider = Arc::new(MockEspProvider::new(ProviderKind::Mailchimp));
        let store = Arc::new(InMemoryNewsletterStore::new());
        let gate = SendGate::new(provider, store);
        let newsletter = Newsletter::new(NewsletterId::new(9), "Draft");

        let result = gate.send(&newsletter, String::new()).await;

        assert_eq!(
            result,
            Err(SendError::NotSendable {
                newsletter_id: 9,
                status: NewsletterStatus::Draft,
            })
        );
    }

    #[tokio::test]
    async fn provider_failure_is_logged_and_not_marked_sent() {
        let provider = Arc::new(
            MockEspProvider::new(ProviderKind::Mailchimp)
                .with_op_failure(MockOp::Send, EspError::api("500", "campaign error")),
        );
        let store = Arc::new(InMemoryNewsletterStore::new());
        let gate = SendGate::new(provider, store.clone());
        let newsletter = queued_newsletter(9);

        let result = gate.send(&newsletter, "<p>hi</p>".into()).await;

        assert!(matches!(result, Err(SendError::Provider(_))));
        assert!(!store.is_sent(newsletter.id).await.unwrap());
        let errors = store.send_errors(newsletter.id).await.unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("campaign error"));
    }
}
