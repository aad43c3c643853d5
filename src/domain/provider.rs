//! The closed set of supported email service providers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::foundation::ValidationError;

/// Every ESP integration this service ships.
///
/// Adding a provider is a deliberate, compile-checked change: the enum is
/// matched exhaustively wherever provider-specific behavior branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Mailchimp,
    ActiveCampaign,
    CampaignMonitor,
    ConstantContact,
    /// No-op provider for sites that copy rendered HTML by hand.
    Manual,
    /// Promotions partner; carries no contact lists of its own.
    Letterhead,
}

impl ProviderKind {
    /// Stable configuration/wire name for the provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Mailchimp => "mailchimp",
            ProviderKind::ActiveCampaign => "active_campaign",
            ProviderKind::CampaignMonitor => "campaign_monitor",
            ProviderKind::ConstantContact => "constant_contact",
            ProviderKind::Manual => "manual",
            ProviderKind::Letterhead => "letterhead",
        }
    }

    /// All provider kinds, in configuration order.
    pub fn all() -> [ProviderKind; 6] {
        [
            ProviderKind::Mailchimp,
            ProviderKind::ActiveCampaign,
            ProviderKind::CampaignMonitor,
            ProviderKind::ConstantContact,
            ProviderKind::Manual,
            ProviderKind::Letterhead,
        ]
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mailchimp" => Ok(ProviderKind::Mailchimp),
            "active_campaign" => Ok(ProviderKind::ActiveCampaign),
            "campaign_monitor" => Ok(ProviderKind::CampaignMonitor),
            "constant_contact" => Ok(ProviderKind::ConstantContact),
            "manual" => Ok(ProviderKind::Manual),
            "letterhead" => Ok(ProviderKind::Letterhead),
            other => Err(ValidationError::invalid_format(
                "provider",
                format!("unknown provider '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_round_trips_through_its_name() {
        for kind in ProviderKind::all() {
            assert_eq!(kind.as_str().parse::<ProviderKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert!("sendgrid".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn serde_uses_snake_case_names() {
        let json = serde_json::to_string(&ProviderKind::ActiveCampaign).unwrap();
        assert_eq!(json, "\"active_campaign\"");
    }
}
