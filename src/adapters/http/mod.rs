//! HTTP adapters - the REST surface consumed by the authoring/admin UI
//! and the WooCommerce webhook intake.

pub mod newsletters;
pub mod webhooks;

pub use newsletters::{newsletter_routes, NewsletterAppState};
pub use webhooks::{webhook_routes, WebhookAppState};
