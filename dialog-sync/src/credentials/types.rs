//! Credential types.

use serde::{Deserialize, Serialize};
use signed_token::{SigningKey, TokenError};

use crate::config::PluginConfig;

/// Namespace of the broker token's custom properties.
pub const PROPERTY_NAMESPACE: &str = "mod_englishcentral";

/// Credential fields resolved from settings or the broker token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialField {
    PartnerId,
    ConsumerKey,
    ConsumerSecret,
    EncryptedSecret,
}

impl CredentialField {
    pub const ALL: [CredentialField; 4] = [
        Self::PartnerId,
        Self::ConsumerKey,
        Self::ConsumerSecret,
        Self::EncryptedSecret,
    ];

    /// Settings key of the field.
    pub fn key(self) -> &'static str {
        match self {
            Self::PartnerId => "partnerid",
            Self::ConsumerKey => "consumerkey",
            Self::ConsumerSecret => "consumersecret",
            Self::EncryptedSecret => "encryptedsecret",
        }
    }

    /// Human readable name for diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            Self::PartnerId => "Partner ID",
            Self::ConsumerKey => "Consumer key",
            Self::ConsumerSecret => "Consumer secret",
            Self::EncryptedSecret => "Encrypted secret",
        }
    }

    /// Custom property carrying this field in a broker token.
    pub fn property_name(self) -> String {
        format!("{}_{}", PROPERTY_NAMESPACE, self.key())
    }

    /// Value stored in the plugin settings.
    pub fn stored(self, config: &PluginConfig) -> &str {
        match self {
            Self::PartnerId => &config.partner_id,
            Self::ConsumerKey => &config.consumer_key,
            Self::ConsumerSecret => &config.consumer_secret,
            Self::EncryptedSecret => &config.encrypted_secret,
        }
    }
}

impl std::fmt::Display for CredentialField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub chat_mode: bool,
}

/// Resolved credentials for one request. Empty strings mean "not configured".
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSet {
    pub partner_id: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    pub encrypted_secret: String,
    pub feature_flags: FeatureFlags,
}

impl CredentialSet {
    pub fn get(&self, field: CredentialField) -> &str {
        match field {
            CredentialField::PartnerId => &self.partner_id,
            CredentialField::ConsumerKey => &self.consumer_key,
            CredentialField::ConsumerSecret => &self.consumer_secret,
            CredentialField::EncryptedSecret => &self.encrypted_secret,
        }
    }

    pub(crate) fn set(&mut self, field: CredentialField, value: String) {
        match field {
            CredentialField::PartnerId => self.partner_id = value,
            CredentialField::ConsumerKey => self.consumer_key = value,
            CredentialField::ConsumerSecret => self.consumer_secret = value,
            CredentialField::EncryptedSecret => self.encrypted_secret = value,
        }
    }

    /// Key for signing identity assertions and authorization headers.
    pub fn signing_key(&self) -> Result<SigningKey, TokenError> {
        SigningKey::from_url_safe_base64(&self.encrypted_secret)
    }
}

impl std::fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSet")
            .field("partner_id", &self.partner_id)
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("encrypted_secret", &"<redacted>")
            .field("feature_flags", &self.feature_flags)
            .finish()
    }
}
