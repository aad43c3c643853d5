//! PostgreSQL implementation of the list registry.

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;

use crate::domain::lists::{FormId, ProviderListSettings, SubscriptionList};
use crate::domain::provider::ProviderKind;
use crate::ports::{ListRegistry, RegistryError};

/// PostgreSQL implementation of the `ListRegistry` port.
pub struct PostgresListRegistry {
    pool: PgPool,
}

impl PostgresListRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a subscription list.
#[derive(Debug, sqlx::FromRow)]
struct ListRow {
    form_id: i64,
    title: String,
    description: String,
    settings: serde_json::Value,
}

impl TryFrom<ListRow> for SubscriptionList {
    type Error = RegistryError;

    fn try_from(row: ListRow) -> Result<Self, Self::Error> {
        let settings: HashMap<ProviderKind, ProviderListSettings> =
            serde_json::from_value(row.settings)
                .map_err(|e| RegistryError::storage(format!("Invalid settings JSON: {}", e)))?;
        Ok(SubscriptionList {
            form_id: FormId::new(row.form_id as u64),
            title: row.title,
            description: row.description,
            settings,
        })
    }
}

const SELECT_LIST: &str =
    "SELECT form_id, title, description, settings FROM subscription_lists";

#[async_trait]
impl ListRegistry for PostgresListRegistry {
    async fn resolve(&self, form_id: FormId) -> Result<SubscriptionList, RegistryError> {
        let row = sqlx::query_as::<_, ListRow>(&format!("{} WHERE form_id = $1", SELECT_LIST))
            .bind(form_id.as_u64() as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RegistryError::storage(e.to_string()))?;
        match row {
            Some(row) => row.try_into(),
            None => Err(RegistryError::ListNotFound { form_id }),
        }
    }

    async fn configured_for_provider(
        &self,
        provider: ProviderKind,
    ) -> Result<Vec<SubscriptionList>, RegistryError> {
        Ok(self
            .all()
            .await?
            .into_iter()
            .filter(|list| list.is_configured_for(provider))
            .collect())
    }

    async fn all(&self) -> Result<Vec<SubscriptionList>, RegistryError> {
        let rows = sqlx::query_as::<_, ListRow>(&format!("{} ORDER BY form_id", SELECT_LIST))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RegistryError::storage(e.to_string()))?;
        rows.into_iter().map(SubscriptionList::try_from).collect()
    }
}
