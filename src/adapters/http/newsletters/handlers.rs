//! HTTP handlers for the newsletter API.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::application::sync::{ContactSyncEngine, SyncContext};
use crate::domain::contact::{Contact, EmailAddress};
use crate::domain::foundation::{NewsletterId, UserId};
use crate::ports::NewsletterStore;

use super::dto::{
    ErrorResponse, ResyncContactRequest, ResyncContactResponse, SyncErrorsResponse,
    TestEmailsRequest, TestEmailsResponse,
};

/// Shared state for the newsletter API.
#[derive(Clone)]
pub struct NewsletterAppState {
    pub engine: Arc<ContactSyncEngine>,
    pub store: Arc<dyn NewsletterStore>,
}

fn bad_request(code: &str, message: impl ToString) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(code, message.to_string())),
    )
        .into_response()
}

/// `POST /contacts/resync` - re-push one contact to the active provider.
pub async fn resync_contact(
    State(state): State<NewsletterAppState>,
    Json(request): Json<ResyncContactRequest>,
) -> Response {
    let email = match EmailAddress::new(&request.email) {
        Ok(email) => email,
        Err(err) => return bad_request("invalid_email", err),
    };
    let mut contact = Contact::new(email.clone());
    if let Some(name) = request.name {
        contact = contact.with_name(name);
    }

    let ctx = SyncContext::new();
    match state.engine.sync_contact(&ctx, &contact).await {
        Ok(_) => Json(ResyncContactResponse {
            email: email.to_string(),
            synced: true,
        })
        .into_response(),
        Err(err) => bad_request("sync_failed", err),
    }
}

/// `GET /newsletters/{id}/sync-errors` - the retained send failures.
pub async fn sync_errors(
    State(state): State<NewsletterAppState>,
    Path(id): Path<u64>,
) -> Response {
    let newsletter_id = NewsletterId::new(id);
    match state.store.send_errors(newsletter_id).await {
        Ok(errors) => Json(SyncErrorsResponse {
            newsletter_id: id,
            errors,
        })
        .into_response(),
        Err(err) => bad_request("storage_error", err),
    }
}

/// `PUT /users/{id}/test-emails` - replace test recipient addresses.
pub async fn set_test_emails(
    State(state): State<NewsletterAppState>,
    Path(id): Path<u64>,
    Json(request): Json<TestEmailsRequest>,
) -> Response {
    let mut emails = Vec::with_capacity(request.emails.len());
    for raw in &request.emails {
        match EmailAddress::new(raw) {
            Ok(email) => emails.push(email),
            Err(err) => return bad_request("invalid_email", format!("{}: {}", raw, err)),
        }
    }

    let user_id = UserId::new(id);
    match state.store.set_test_emails(user_id, emails.clone()).await {
        Ok(()) => Json(TestEmailsResponse {
            user_id: id,
            emails: emails.into_iter().map(|e| e.to_string()).collect(),
        })
        .into_response(),
        Err(err) => bad_request("storage_error", err),
    }
}
