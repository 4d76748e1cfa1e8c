//! Stored plugin settings.

use serde::{Deserialize, Serialize};

/// Production remote domain.
pub const PRODUCTION_DOMAIN: &str = "englishcentral.com";

/// QA remote domain used in development mode.
pub const QA_DOMAIN: &str = "qaenglishcentral.com";

/// Site-wide plugin settings as stored by the host.
///
/// Credential fields may be left empty; the resolver then falls back to the
/// broker token.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PluginConfig {
    pub broker_user: String,
    pub broker_secret: String,
    pub partner_id: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    pub encrypted_secret: String,
    /// Site switch for the conversation ("chat") activity.
    pub chat_mode: bool,
    /// Talk to the QA hosts instead of production.
    pub development_mode: bool,
    pub player_version: String,
    /// Defaults applied to new activities.
    pub default_watch_goal: i64,
    pub default_learn_goal: i64,
    pub default_speak_goal: i64,
    pub default_chat_goal: i64,
}

impl PluginConfig {
    pub fn sdk_mode(&self) -> SdkMode {
        if self.development_mode {
            SdkMode::Development
        } else {
            SdkMode::Production
        }
    }

    pub fn has_broker_credentials(&self) -> bool {
        !self.broker_user.trim().is_empty() && !self.broker_secret.trim().is_empty()
    }

    /// Whether the four direct credential fields are all stored.
    pub fn has_direct_credentials(&self) -> bool {
        [
            &self.partner_id,
            &self.consumer_key,
            &self.consumer_secret,
            &self.encrypted_secret,
        ]
        .iter()
        .all(|v| !v.trim().is_empty())
    }
}

/// Which remote environment the player and API calls target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdkMode {
    Production,
    Development,
}

impl SdkMode {
    pub fn domain(self) -> &'static str {
        match self {
            Self::Production => PRODUCTION_DOMAIN,
            Self::Development => QA_DOMAIN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_follows_development_mode() {
        let mut config = PluginConfig::default();
        assert_eq!(config.sdk_mode().domain(), "englishcentral.com");
        config.development_mode = true;
        assert_eq!(config.sdk_mode().domain(), "qaenglishcentral.com");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PluginConfig =
            serde_json::from_str(r#"{"partner_id":"12","chat_mode":true}"#).unwrap();
        assert_eq!(config.partner_id, "12");
        assert!(config.chat_mode);
        assert!(config.consumer_key.is_empty());
        assert!(!config.has_direct_credentials());
        assert!(!config.has_broker_credentials());
    }
}
