//! PostgreSQL persistence adapters.

mod list_registry;
mod newsletter_store;
mod snapshot_store;

pub use list_registry::PostgresListRegistry;
pub use newsletter_store::PostgresNewsletterStore;
pub use snapshot_store::PostgresSnapshotStore;
