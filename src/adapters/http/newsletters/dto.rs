//! Request/response DTOs for the newsletter API.

use serde::{Deserialize, Serialize};

use crate::domain::newsletter::SendErrorEntry;

/// Request to resync one contact to the active provider.
#[derive(Debug, Deserialize)]
pub struct ResyncContactRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Successful resync response.
#[derive(Debug, Serialize)]
pub struct ResyncContactResponse {
    pub email: String,
    pub synced: bool,
}

/// A newsletter's retained send failures.
#[derive(Debug, Serialize)]
pub struct SyncErrorsResponse {
    pub newsletter_id: u64,
    pub errors: Vec<SendErrorEntry>,
}

/// Request to replace a user's test recipient addresses.
#[derive(Debug, Deserialize)]
pub struct TestEmailsRequest {
    pub emails: Vec<String>,
}

/// Current test recipient addresses.
#[derive(Debug, Serialize)]
pub struct TestEmailsResponse {
    pub user_id: u64,
    pub emails: Vec<String>,
}

/// Structured error body; business and validation errors map to 400.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
