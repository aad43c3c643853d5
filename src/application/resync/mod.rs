//! Bulk resync of commerce contacts.

mod driver;

pub use driver::{ResyncConfig, ResyncError, WooResyncDriver, DEFAULT_BATCH_SIZE};
