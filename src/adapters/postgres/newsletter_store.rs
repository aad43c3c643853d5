//! PostgreSQL implementation of the newsletter send-state store.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::contact::EmailAddress;
use crate::domain::foundation::{NewsletterId, UserId};
use crate::domain::newsletter::{push_send_error, SendErrorEntry};
use crate::ports::{NewsletterStore, NewsletterStoreError};

/// PostgreSQL implementation of the `NewsletterStore` port.
pub struct PostgresNewsletterStore {
    pool: PgPool,
}

impl PostgresNewsletterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn storage_err(e: impl std::fmt::Display) -> NewsletterStoreError {
        NewsletterStoreError::new(e.to_string())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SentRow {
    sent: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct ErrorsRow {
    send_errors: serde_json::Value,
}

#[derive(Debug, sqlx::FromRow)]
struct EmailsRow {
    emails: serde_json::Value,
}

#[async_trait]
impl NewsletterStore for PostgresNewsletterStore {
    async fn is_sent(&self, id: NewsletterId) -> Result<bool, NewsletterStoreError> {
        let row = sqlx::query_as::<_, SentRow>(
            "SELECT sent FROM newsletter_send_state WHERE newsletter_id = $1",
        )
        .bind(id.as_u64() as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::storage_err)?;
        Ok(row.map(|r| r.sent).unwrap_or(false))
    }

    async fn mark_sent(&self, id: NewsletterId) -> Result<(), NewsletterStoreError> {
        sqlx::query(
            "INSERT INTO newsletter_send_state (newsletter_id, sent, updated_at)
             VALUES ($1, TRUE, now())
             ON CONFLICT (newsletter_id) DO UPDATE SET sent = TRUE, updated_at = now()",
        )
        .bind(id.as_u64() as i64)
        .execute(&self.pool)
        .await
        .map_err(Self::storage_err)?;
        Ok(())
    }

    async fn record_send_error(
        &self,
        id: NewsletterId,
        entry: SendErrorEntry,
    ) -> Result<(), NewsletterStoreError> {
        let mut log = self.send_errors(id).await?;
        push_send_error(&mut log, entry);
        let value = serde_json::to_value(&log).map_err(Self::storage_err)?;
        sqlx::query(
            "INSERT INTO newsletter_send_state (newsletter_id, send_errors, updated_at)
             VALUES ($1, $2, now())
             ON CONFLICT (newsletter_id) DO UPDATE SET send_errors = $2, updated_at = now()",
        )
        .bind(id.as_u64() as i64)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(Self::storage_err)?;
        Ok(())
    }

    async fn send_errors(
        &self,
        id: NewsletterId,
    ) -> Result<Vec<SendErrorEntry>, NewsletterStoreError> {
        let row = sqlx::query_as::<_, ErrorsRow>(
            "SELECT send_errors FROM newsletter_send_state WHERE newsletter_id = $1",
        )
        .bind(id.as_u64() as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::storage_err)?;
        match row {
            Some(row) => serde_json::from_value(row.send_errors).map_err(Self::storage_err),
            None => Ok(Vec::new()),
        }
    }

    async fn test_emails(
        &self,
        user_id: UserId,
    ) -> Result<Vec<EmailAddress>, NewsletterStoreError> {
        let row = sqlx::query_as::<_, EmailsRow>(
            "SELECT emails FROM test_email_preferences WHERE user_id = $1",
        )
        .bind(user_id.as_u64() as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::storage_err)?;
        match row {
            Some(row) => serde_json::from_value(row.emails).map_err(Self::storage_err),
            None => Ok(Vec::new()),
        }
    }

    async fn set_test_emails(
        &self,
        user_id: UserId,
        emails: Vec<EmailAddress>,
    ) -> Result<(), NewsletterStoreError> {
        let value = serde_json::to_value(&emails).map_err(Self::storage_err)?;
        sqlx::query(
            "INSERT INTO test_email_preferences (user_id, emails, updated_at)
             VALUES ($1, $2, now())
             ON CONFLICT (user_id) DO UPDATE SET emails = $2, updated_at = now()",
        )
        .bind(user_id.as_u64() as i64)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(Self::storage_err)?;
        Ok(())
    }
}
