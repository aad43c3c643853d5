//! Newsletter send-state domain.
//!
//! Only the sliver of the newsletter post lifecycle the send gate needs:
//! a status machine whose terminal state is "sent", and a bounded log of
//! send failures.

use serde::{Deserialize, Serialize};

use super::foundation::{NewsletterId, StateMachine, Timestamp};

/// How many send errors are retained per newsletter.
pub const SEND_ERROR_LOG_CAPACITY: usize = 10;

/// Send lifecycle of a newsletter post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsletterStatus {
    /// Being authored.
    Draft,
    /// Approved and waiting for delivery.
    Queued,
    /// Handed to the provider.
    Sending,
    /// Delivered. Terminal; a newsletter is sent at most once.
    Sent,
}

impl StateMachine for NewsletterStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use NewsletterStatus::*;
        matches!(
            (self, target),
            (Draft, Queued)
                | (Queued, Sending)
                | (Queued, Draft)
                | (Sending, Sent)
                | (Sending, Queued) // Provider failure, retry later
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use NewsletterStatus::*;
        match self {
            Draft => vec![Queued],
            Queued => vec![Sending, Draft],
            Sending => vec![Sent, Queued],
            Sent => vec![],
        }
    }
}

/// A newsletter post, reduced to what the send gate needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Newsletter {
    pub id: NewsletterId,
    pub subject: String,
    pub status: NewsletterStatus,
}

impl Newsletter {
    pub fn new(id: NewsletterId, subject: impl Into<String>) -> Self {
        Self {
            id,
            subject: subject.into(),
            status: NewsletterStatus::Draft,
        }
    }
}

/// One recorded send failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendErrorEntry {
    pub message: String,
    pub occurred_at: Timestamp,
}

impl SendErrorEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            occurred_at: Timestamp::now(),
        }
    }
}

/// Appends an entry to a send-error log, keeping only the most recent
/// [`SEND_ERROR_LOG_CAPACITY`] entries (newest last).
pub fn push_send_error(log: &mut Vec<SendErrorEntry>, entry: SendErrorEntry) {
    log.push(entry);
    if log.len() > SEND_ERROR_LOG_CAPACITY {
        let excess = log.len() - SEND_ERROR_LOG_CAPACITY;
        log.drain(..excess);
    }
}
