//! WooCommerce webhook intake.
//!
//! Verifies each delivery's signature, parses the membership event, and
//! hands it to the bridge. Bridge failures are logged, never surfaced:
//! returning an error would make WooCommerce retry and could stall its
//! delivery queue, and a sync problem must never break the commerce side.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;

use crate::adapters::woocommerce::{parse_membership_event, WebhookError, WooWebhookVerifier};
use crate::application::membership::MembershipBridge;
use crate::application::sync::SyncContext;

const SIGNATURE_HEADER: &str = "x-wc-webhook-signature";
const TOPIC_HEADER: &str = "x-wc-webhook-topic";

/// Shared state for webhook intake.
#[derive(Clone)]
pub struct WebhookAppState {
    pub bridge: Arc<MembershipBridge>,
    pub verifier: Arc<WooWebhookVerifier>,
}

/// Creates the webhook router.
pub fn webhook_routes() -> Router<WebhookAppState> {
    Router::new().route("/woocommerce", post(handle_woocommerce_webhook))
}

/// `POST /webhooks/woocommerce`
pub async fn handle_woocommerce_webhook(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok())
    else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"code": "missing_signature"})),
        )
            .into_response();
    };
    if let Err(err) = state.verifier.verify(&body, signature) {
        tracing::warn!("webhook signature rejected: {}", err);
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"code": "invalid_signature"})),
        )
            .into_response();
    }

    let topic = headers
        .get(TOPIC_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    match parse_membership_event(topic, &body) {
        Ok(event) => {
            let ctx = SyncContext::new();
            state.bridge.dispatch(&ctx, event).await;
            (StatusCode::OK, Json(json!({"received": true}))).into_response()
        }
        Err(WebhookError::UnhandledTopic(topic)) => {
            // Acknowledge topics we don't consume so WooCommerce doesn't
            // retry them forever.
            tracing::debug!("ignoring webhook topic '{}'", topic);
            (StatusCode::OK, Json(json!({"ignored": true}))).into_response()
        }
        Err(err) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"code": "invalid_payload", "message": err.to_string()})),
        )
            .into_response(),
    }
}
