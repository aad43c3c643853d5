//! Feature flags configuration

use serde::Deserialize;

/// Feature flags for enabling/disabling functionality
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FeatureFlags {
    /// Readers pick newsletters at checkout; membership reactivation only
    /// resubscribes a paused membership with snapshot evidence
    #[serde(default)]
    pub post_checkout_signup: bool,

    /// Show detailed error messages (disable in production!)
    #[serde(default)]
    pub verbose_errors: bool,

    /// Enable request tracing
    #[serde(default = "default_enable_tracing")]
    pub enable_tracing: bool,
}

fn default_enable_tracing() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_flags_default_off() {
        let flags = FeatureFlags::default();
        assert!(!flags.post_checkout_signup);
        assert!(!flags.verbose_errors);
    }

    #[test]
    fn feature_flags_deserialize() {
        let json = r#"{
            "post_checkout_signup": true,
            "enable_tracing": true
        }"#;
        let flags: FeatureFlags = serde_json::from_str(json).unwrap();
        assert!(flags.post_checkout_signup);
        assert!(flags.enable_tracing);
    }
}
