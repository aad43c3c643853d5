//! Strongly-typed identifier value objects.
//!
//! All identifiers originating from the site's content-management layer and
//! the commerce plugin are numeric. Wrapping them keeps a user id from being
//! passed where an order id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

macro_rules! numeric_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Creates an id from its raw numeric value.
            pub fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the raw numeric value.
            pub fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

numeric_id! {
    /// Unique identifier for a site user (reader).
    UserId
}

numeric_id! {
    /// Unique identifier for a WooCommerce membership record.
    MembershipId
}

numeric_id! {
    /// Unique identifier for a membership plan.
    PlanId
}

numeric_id! {
    /// Unique identifier for a WooCommerce subscription.
    SubscriptionId
}

numeric_id! {
    /// Unique identifier for a WooCommerce order.
    OrderId
}

numeric_id! {
    /// Unique identifier for a newsletter post.
    NewsletterId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_strings() {
        let id = UserId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!("42".parse::<UserId>().unwrap(), id);
    }

    #[test]
    fn id_parse_rejects_garbage() {
        assert!("not-a-number".parse::<MembershipId>().is_err());
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&NewsletterId::new(1201)).unwrap();
        assert_eq!(json, "1201");
    }
}
