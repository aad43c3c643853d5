//! WooCommerce webhook verification and event parsing.
//!
//! WooCommerce signs each delivery with base64-encoded HMAC-SHA256 of the
//! raw body in the `X-WC-Webhook-Signature` header; the topic arrives in
//! `X-WC-Webhook-Topic`. Verification uses constant-time comparison.

use base64::Engine;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::domain::foundation::{MembershipId, PlanId, UserId};
use crate::domain::membership::{
    Membership, MembershipEvent, MembershipSaved, MembershipStatus,
};

/// Webhook processing errors.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The signature header is missing.
    #[error("Missing signature header")]
    MissingSignature,

    /// Failed to parse the payload or a field within it.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The topic is one this service does not consume.
    #[error("Unhandled topic: {0}")]
    UnhandledTopic(String),
}

/// Verifier for WooCommerce webhook signatures.
pub struct WooWebhookVerifier {
    secret: Secret<String>,
}

impl WooWebhookVerifier {
    /// Creates a new verifier with the given webhook secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Secret::new(secret.into()),
        }
    }

    /// Verifies a delivery's signature against the raw body.
    pub fn verify(&self, payload: &[u8], signature_header: &str) -> Result<(), WebhookError> {
        let provided = base64::engine::general_purpose::STANDARD
            .decode(signature_header.trim())
            .map_err(|_| WebhookError::InvalidSignature)?;
        let expected = self.compute_signature(payload);
        if !constant_time_compare(&expected, &provided) {
            return Err(WebhookError::InvalidSignature);
        }
        Ok(())
    }

    fn compute_signature(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC accepts any key");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Performs constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Parses a verified delivery into a membership event.
///
/// The status-changed payload carries both the old and the new status, so
/// the bridge can treat the transition atomically.
pub fn parse_membership_event(topic: &str, payload: &[u8]) -> Result<MembershipEvent, WebhookError> {
    match topic {
        "membership.status_changed" => {
            let body: StatusChangedPayload = parse(payload)?;
            Ok(MembershipEvent::StatusChanged {
                membership: Membership::new(
                    MembershipId::new(body.id),
                    UserId::new(body.customer_id),
                    PlanId::new(body.plan_id),
                    parse_status(&body.status)?,
                ),
                old_status: parse_status(&body.previous_status)?,
                new_status: parse_status(&body.status)?,
            })
        }
        "membership.saved" => {
            let body: SavedPayload = parse(payload)?;
            Ok(MembershipEvent::Saved {
                plan_id: PlanId::new(body.plan_id),
                saved: MembershipSaved {
                    user_id: UserId::new(body.customer_id),
                    membership_id: MembershipId::new(body.id),
                    is_update: body.is_update,
                },
            })
        }
        "membership.deleted" => {
            let body: StatusChangedPayload = parse(payload)?;
            Ok(MembershipEvent::Deleted {
                membership: Membership::new(
                    MembershipId::new(body.id),
                    UserId::new(body.customer_id),
                    PlanId::new(body.plan_id),
                    parse_status(&body.status)?,
                ),
            })
        }
        other => Err(WebhookError::UnhandledTopic(other.to_string())),
    }
}

fn parse<T: serde::de::DeserializeOwned>(payload: &[u8]) -> Result<T, WebhookError> {
    serde_json::from_slice(payload).map_err(|e| WebhookError::ParseError(e.to_string()))
}

fn parse_status(raw: &str) -> Result<MembershipStatus, WebhookError> {
    raw.parse()
        .map_err(|_| WebhookError::ParseError(format!("unknown status '{}'", raw)))
}

#[derive(Debug, Deserialize)]
struct StatusChangedPayload {
    id: u64,
    customer_id: u64,
    plan_id: u64,
    status: String,
    #[serde(default)]
    previous_status: String,
}

#[derive(Debug, Deserialize)]
struct SavedPayload {
    id: u64,
    customer_id: u64,
    plan_id: u64,
    #[serde(default)]
    is_update: bool,
}
