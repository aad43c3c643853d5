//! ESP provider adapters.
//!
//! One adapter per [`crate::domain::provider::ProviderKind`], plus the
//! registry that builds them and a mock for tests.

mod active_campaign;
mod campaign_monitor;
mod constant_contact;
mod letterhead;
mod mailchimp;
mod manual;
mod mock;
mod registry;
mod util;

pub use active_campaign::ActiveCampaignProvider;
pub use campaign_monitor::CampaignMonitorProvider;
pub use constant_contact::ConstantContactProvider;
pub use letterhead::LetterheadProvider;
pub use mailchimp::MailchimpProvider;
pub use manual::ManualProvider;
pub use mock::{MockCall, MockEspProvider, MockOp};
pub use registry::ProviderRegistry;
