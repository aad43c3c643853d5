//! List identifiers as they arrive at sync operations.
//!
//! Callers hand the engine a mix of local form ids (site-owned lists) and
//! provider-native list ids. Whether an id is local is a structural property
//! of the id itself, so the distinction is parsed once at the boundary and
//! carried in the type from then on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Wire prefix marking a local form id, e.g. `local-42`.
const LOCAL_PREFIX: &str = "local-";

/// Identifier of a site-owned subscription list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormId(u64);

impl FormId {
    /// Creates a form id from its raw numeric value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw numeric value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", LOCAL_PREFIX, self.0)
    }
}

impl FromStr for FormId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix(LOCAL_PREFIX).unwrap_or(s);
        Ok(Self(digits.parse()?))
    }
}

/// Identifier of a list/audience in the provider's own data model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NativeListId(String);

impl NativeListId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NativeListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier (or name) of a provider-side tag used to emulate local lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(String);

impl TagId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A list identifier passed to sync operations.
///
/// Local targets must be resolved through the registry before any provider
/// call; native targets pass straight through. Providers never see a local
/// identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListTarget {
    Local(FormId),
    Native(NativeListId),
}

impl ListTarget {
    /// Parses a raw id, classifying it structurally, with no I/O.
    ///
    /// `local-<n>` is a local form id; anything else is provider-native.
    /// A malformed `local-` id is treated as native rather than rejected,
    /// matching how unknown ids from older configs were handled.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(LOCAL_PREFIX) {
            Some(digits) => match digits.parse::<u64>() {
                Ok(n) => ListTarget::Local(FormId::new(n)),
                Err(_) => ListTarget::Native(NativeListId::new(raw)),
            },
            None => ListTarget::Native(NativeListId::new(raw)),
        }
    }

    /// Structural test: is this a local form id?
    pub fn is_local(&self) -> bool {
        matches!(self, ListTarget::Local(_))
    }
}

impl fmt::Display for ListTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListTarget::Local(form_id) => write!(f, "{}", form_id),
            ListTarget::Native(list_id) => write!(f, "{}", list_id),
        }
    }
}

impl From<FormId> for ListTarget {
    fn from(form_id: FormId) -> Self {
        ListTarget::Local(form_id)
    }
}

impl From<NativeListId> for ListTarget {
    fn from(list_id: NativeListId) -> Self {
        ListTarget::Native(list_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_prefix_parses_as_local() {
        let target = ListTarget::parse("local-42");
        assert_eq!(target, ListTarget::Local(FormId::new(42)));
        assert!(target.is_local());
    }

    #[test]
    fn provider_id_parses_as_native() {
        let target = ListTarget::parse("a1b2c3d4e5");
        assert_eq!(target, ListTarget::Native(NativeListId::new("a1b2c3d4e5")));
        assert!(!target.is_local());
    }

    #[test]
    fn malformed_local_id_falls_back_to_native() {
        let target = ListTarget::parse("local-not-a-number");
        assert!(!target.is_local());
    }

    #[test]
    fn form_id_displays_with_prefix() {
        assert_eq!(FormId::new(42).to_string(), "local-42");
    }

    #[test]
    fn form_id_parses_with_or_without_prefix() {
        assert_eq!("local-7".parse::<FormId>().unwrap(), FormId::new(7));
        assert_eq!("7".parse::<FormId>().unwrap(), FormId::new(7));
    }

    #[test]
    fn display_round_trips_through_parse() {
        for raw in ["local-9", "9f8e7d"] {
            let target = ListTarget::parse(raw);
            assert_eq!(ListTarget::parse(&target.to_string()), target);
        }
    }
}
