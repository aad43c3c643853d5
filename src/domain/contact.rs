//! Contact value objects.
//!
//! A contact is an ESP-addressable subscriber. The email address is the sole
//! stable identity key across providers; everything else is optional.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::foundation::ValidationError;

/// A validated, lowercase-normalized email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Validates and normalizes an email address.
    ///
    /// Normalization lowercases the address so that lookups against a
    /// provider are case-insensitive, matching how every supported ESP
    /// keys its contacts.
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("email"));
        }
        let (local, domain) = trimmed
            .split_once('@')
            .ok_or_else(|| ValidationError::invalid_format("email", "missing @ symbol"))?;
        if local.is_empty() || domain.is_empty() || !domain.contains('.') {
            return Err(ValidationError::invalid_format(
                "email",
                "expected local@domain.tld",
            ));
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    /// Returns the normalized address.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EmailAddress {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// A subscriber as known to this site.
///
/// A contact may or may not yet exist in the active provider's system;
/// creation is implicit on first add.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// The sole stable identity key.
    pub email: EmailAddress,
    /// Display name, when known.
    pub name: Option<String>,
    /// Free-form key/value metadata (registration source, network site).
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Contact {
    /// Creates a contact with just an email address.
    pub fn new(email: EmailAddress) -> Self {
        Self {
            email,
            name: None,
            metadata: HashMap::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds a metadata field.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn email_is_lowercased_and_trimmed() {
        let email = EmailAddress::new("  Reader@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "reader@example.com");
    }

    #[test]
    fn email_without_at_is_rejected() {
        assert!(EmailAddress::new("not-an-email").is_err());
    }

    #[test]
    fn email_without_domain_dot_is_rejected() {
        assert!(EmailAddress::new("reader@localhost").is_err());
    }

    #[test]
    fn empty_email_is_rejected() {
        assert!(matches!(
            EmailAddress::new("   "),
            Err(ValidationError::EmptyField { .. })
        ));
    }

    #[test]
    fn contact_builder_accumulates_metadata() {
        let contact = Contact::new(EmailAddress::new("reader@example.com").unwrap())
            .with_name("A Reader")
            .with_metadata("registration_source", "checkout");

        assert_eq!(contact.name.as_deref(), Some("A Reader"));
        assert_eq!(
            contact.metadata.get("registration_source").map(String::as_str),
            Some("checkout")
        );
    }

    proptest! {
        #[test]
        fn valid_emails_normalize_idempotently(
            local in "[a-z0-9]{1,12}",
            domain in "[a-z0-9]{1,12}",
        ) {
            let raw = format!("{}@{}.org", local, domain);
            let once = EmailAddress::new(&raw).unwrap();
            let twice = EmailAddress::new(once.as_str()).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
