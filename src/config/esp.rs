//! ESP provider configuration

use serde::Deserialize;

use crate::domain::provider::ProviderKind;
use crate::ports::ApiCredentials;

use super::error::ValidationError;

/// ESP provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EspConfig {
    /// The active provider for this site
    #[serde(default = "default_provider")]
    pub active: ProviderKind,

    /// Default audience/master list for commerce contact sync
    pub audience_id: Option<String>,

    /// Mailchimp API key (`<key>-<dc>`)
    pub mailchimp_api_key: Option<String>,

    /// ActiveCampaign account API URL
    pub active_campaign_api_url: Option<String>,
    /// ActiveCampaign API key
    pub active_campaign_api_key: Option<String>,

    /// Campaign Monitor API key
    pub campaign_monitor_api_key: Option<String>,
    /// Campaign Monitor client id
    pub campaign_monitor_client_id: Option<String>,

    /// Constant Contact OAuth access token
    pub constant_contact_access_token: Option<String>,

    /// Letterhead API key
    pub letterhead_api_key: Option<String>,
}

impl EspConfig {
    /// Credentials for one provider, when configured.
    ///
    /// Manual needs none and always yields an empty credential set.
    pub fn credentials_for(&self, kind: ProviderKind) -> Option<ApiCredentials> {
        fn field(name: &str, value: &Option<String>) -> Option<ApiCredentials> {
            value
                .as_ref()
                .filter(|v| !v.is_empty())
                .map(|v| ApiCredentials::new().with_field(name, v.clone()))
        }

        match kind {
            ProviderKind::Mailchimp => field("api_key", &self.mailchimp_api_key),
            ProviderKind::ActiveCampaign => {
                let url = self.active_campaign_api_url.as_ref().filter(|v| !v.is_empty())?;
                let key = self.active_campaign_api_key.as_ref().filter(|v| !v.is_empty())?;
                Some(
                    ApiCredentials::new()
                        .with_field("api_url", url.clone())
                        .with_field("api_key", key.clone()),
                )
            }
            ProviderKind::CampaignMonitor => {
                let key = self.campaign_monitor_api_key.as_ref().filter(|v| !v.is_empty())?;
                let client = self
                    .campaign_monitor_client_id
                    .as_ref()
                    .filter(|v| !v.is_empty())?;
                Some(
                    ApiCredentials::new()
                        .with_field("api_key", key.clone())
                        .with_field("client_id", client.clone()),
                )
            }
            ProviderKind::ConstantContact => {
                field("access_token", &self.constant_contact_access_token)
            }
            ProviderKind::Manual => Some(ApiCredentials::new()),
            ProviderKind::Letterhead => field("api_key", &self.letterhead_api_key),
        }
    }

    /// Validate ESP configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.active != ProviderKind::Manual && self.credentials_for(self.active).is_none() {
            return Err(ValidationError::ProviderNotCredentialed(
                self.active.as_str(),
            ));
        }
        if self.active == ProviderKind::Mailchimp {
            let key = self.mailchimp_api_key.as_deref().unwrap_or_default();
            if !key.contains('-') {
                return Err(ValidationError::InvalidMailchimpKey);
            }
        }
        Ok(())
    }
}

impl Default for EspConfig {
    fn default() -> Self {
        Self {
            active: default_provider(),
            audience_id: None,
            mailchimp_api_key: None,
            active_campaign_api_url: None,
            active_campaign_api_key: None,
            campaign_monitor_api_key: None,
            campaign_monitor_client_id: None,
            constant_contact_access_token: None,
            letterhead_api_key: None,
        }
    }
}

fn default_provider() -> ProviderKind {
    ProviderKind::Manual
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_is_the_default_and_needs_no_credentials() {
        let config = EspConfig::default();
        assert_eq!(config.active, ProviderKind::Manual);
        assert!(config.validate().is_ok());
        assert!(config.credentials_for(ProviderKind::Manual).is_some());
    }

    #[test]
    fn active_provider_without_credentials_fails_validation() {
        let config = EspConfig {
            active: ProviderKind::Mailchimp,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::ProviderNotCredentialed("mailchimp"))
        );
    }

    #[test]
    fn mailchimp_key_shape_is_checked() {
        let config = EspConfig {
            active: ProviderKind::Mailchimp,
            mailchimp_api_key: Some("nodatacenter".to_string()),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidMailchimpKey));
    }

    #[test]
    fn active_campaign_needs_both_url_and_key() {
        let config = EspConfig {
            active_campaign_api_url: Some("https://x.api-us1.com".to_string()),
            ..Default::default()
        };
        assert!(config.credentials_for(ProviderKind::ActiveCampaign).is_none());
    }
}
