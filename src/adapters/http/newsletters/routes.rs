//! Axum router for the newsletter API.

use axum::routing::{get, post, put};
use axum::Router;

use super::handlers::{resync_contact, set_test_emails, sync_errors, NewsletterAppState};

/// Creates the newsletter API router.
///
/// # Routes
///
/// - `POST /contacts/resync` - re-push one contact to the provider
/// - `GET /newsletters/{id}/sync-errors` - retained send failures
/// - `PUT /users/{id}/test-emails` - test recipient preferences
pub fn newsletter_routes() -> Router<NewsletterAppState> {
    Router::new()
        .route("/contacts/resync", post(resync_contact))
        .route("/newsletters/:id/sync-errors", get(sync_errors))
        .route("/users/:id/test-emails", put(set_test_emails))
}
