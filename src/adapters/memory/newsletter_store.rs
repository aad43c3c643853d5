//! In-memory newsletter send-state store.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::domain::contact::EmailAddress;
use crate::domain::foundation::{NewsletterId, UserId};
use crate::domain::newsletter::{push_send_error, SendErrorEntry};
use crate::ports::{NewsletterStore, NewsletterStoreError};

/// In-memory implementation of the `NewsletterStore` port.
#[derive(Default)]
pub struct InMemoryNewsletterStore {
    sent: RwLock<HashSet<NewsletterId>>,
    errors: RwLock<HashMap<NewsletterId, Vec<SendErrorEntry>>>,
    test_emails: RwLock<HashMap<UserId, Vec<EmailAddress>>>,
}

impl InMemoryNewsletterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NewsletterStore for InMemoryNewsletterStore {
    async fn is_sent(&self, id: NewsletterId) -> Result<bool, NewsletterStoreError> {
        Ok(self.sent.read().unwrap().contains(&id))
    }

    async fn mark_sent(&self, id: NewsletterId) -> Result<(), NewsletterStoreError> {
        self.sent.write().unwrap().insert(id);
        Ok(())
    }

    async fn record_send_error(
        &self,
        id: NewsletterId,
        entry: SendErrorEntry,
    ) -> Result<(), NewsletterStoreError> {
        let mut errors = self.errors.write().unwrap();
        push_send_error(errors.entry(id).or_default(), entry);
        Ok(())
    }

    async fn send_errors(
        &self,
        id: NewsletterId,
    ) -> Result<Vec<SendErrorEntry>, NewsletterStoreError> {
        Ok(self.errors.read().unwrap().get(&id).cloned().unwrap_or_default())
    }

    async fn test_emails(
        &self,
        user_id: UserId,
    ) -> Result<Vec<EmailAddress>, NewsletterStoreError> {
        Ok(self
            .test_emails
            .read()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_test_emails(
        &self,
        user_id: UserId,
        emails: Vec<EmailAddress>,
    ) -> Result<(), NewsletterStoreError> {
        self.test_emails.write().unwrap().insert(user_id, emails);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sent_marker_round_trips() {
        let store = InMemoryNewsletterStore::new();
        let id = NewsletterId::new(9);
        assert!(!store.is_sent(id).await.unwrap());
        store.mark_sent(id).await.unwrap();
        assert!(store.is_sent(id).await.unwrap());
    }

    #[tokio::test]
    async fn error_log_is_bounded() {
        let store = InMemoryNewsletterStore::new();
        let id = NewsletterId::new(9);
        for i in 0..14 {
            store
                .record_send_error(id, SendErrorEntry::new(format!("err {}", i)))
                .await
                .unwrap();
        }
        let errors = store.send_errors(id).await.unwrap();
        assert_eq!(errors.len(), 10);
        assert_eq!(errors.last().unwrap().message, "err 13");
    }

    #[tokio::test]
    async fn test_emails_replace_previous_value() {
        let store = InMemoryNewsletterStore::new();
        let user = UserId::new(3);
        let first = vec![EmailAddress::new("a@example.com").unwrap()];
        let second = vec![EmailAddress::new("b@example.com").unwrap()];

        store.set_test_emails(user, first).await.unwrap();
        store.set_test_emails(user, second.clone()).await.unwrap();
        assert_eq!(store.test_emails(user).await.unwrap(), second);
    }
}
