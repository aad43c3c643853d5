//! WooCommerce integration - REST client and webhook intake.

mod client;
mod webhook;

pub use client::{WooClientConfig, WooCommerceClient};
pub use webhook::{parse_membership_event, WebhookError, WooWebhookVerifier};
