//! Credential resolver.
//!
//! Each field comes from the stored settings when non-empty, otherwise from
//! the broker token's custom property, otherwise resolves to an empty string.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use super::broker::{BrokerToken, TokenBroker};
use super::types::{CredentialField, CredentialSet, FeatureFlags, PROPERTY_NAMESPACE};
use crate::config::PluginConfig;

/// Custom property holding the chat feature switch.
const CHAT_PROPERTY: &str = "mimichat";

/// Sentinel value of an enabled boolean custom property.
const ENABLED: &str = "enabled";

/// Resolves stored settings into a [`CredentialSet`].
#[derive(Clone, Default)]
pub struct CredentialResolver {
    broker: Option<Arc<dyn TokenBroker>>,
}

impl CredentialResolver {
    pub fn new(broker: Option<Arc<dyn TokenBroker>>) -> Self {
        Self { broker }
    }

    pub fn without_broker() -> Self {
        Self::default()
    }

    pub fn has_broker(&self) -> bool {
        self.broker.is_some()
    }

    /// Resolve every credential field and the feature flags.
    ///
    /// Never fails: missing values stay empty and are reported later by
    /// [`missing_config`](super::diagnostics::missing_config).
    #[instrument(skip_all, fields(has_broker = self.broker.is_some()))]
    pub async fn resolve(&self, config: &PluginConfig) -> CredentialSet {
        let needs_broker = CredentialField::ALL
            .iter()
            .any(|f| f.stored(config).trim().is_empty())
            || config.chat_mode;
        let token = if needs_broker {
            self.broker_token(config, false).await
        } else {
            None
        };

        let mut set = CredentialSet::default();
        for field in CredentialField::ALL {
            let stored = field.stored(config);
            let value = if !stored.trim().is_empty() {
                stored.to_string()
            } else if let Some(value) = token
                .as_ref()
                .and_then(|t| t.custom_property(&field.property_name()))
            {
                debug!(field = %field, "Credential taken from broker token");
                value.to_string()
            } else {
                String::new()
            };
            set.set(field, value);
        }

        set.feature_flags = FeatureFlags {
            chat_mode: Self::resolve_chat_mode(config, token.as_ref()),
        };
        set
    }

    /// Chat mode is off unless the site switch is on; then the broker token
    /// decides when broker credentials exist, else the direct credentials do.
    fn resolve_chat_mode(config: &PluginConfig, token: Option<&BrokerToken>) -> bool {
        if !config.chat_mode {
            return false;
        }
        if config.has_broker_credentials() {
            let property = format!("{PROPERTY_NAMESPACE}_{CHAT_PROPERTY}");
            return token.and_then(|t| t.custom_property(&property)) == Some(ENABLED);
        }
        config.has_direct_credentials()
    }

    async fn broker_token(&self, config: &PluginConfig, force_refresh: bool) -> Option<BrokerToken> {
        let broker = self.broker.as_ref()?;
        if !config.has_broker_credentials() {
            return None;
        }
        let token = broker
            .fetch_token(&config.broker_user, &config.broker_secret, force_refresh)
            .await;
        if token.is_none() {
            warn!("Broker token fetch failed");
        }
        token
    }

    /// Force a fresh broker token, replacing any cached one.
    #[instrument(skip_all)]
    pub async fn refresh_broker_token(&self, config: &PluginConfig) -> Option<BrokerToken> {
        self.broker_token(config, true).await
    }

    /// Error reported by the broker for the configured account, if any.
    pub async fn broker_error(&self, config: &PluginConfig) -> Option<String> {
        self.broker_token(config, false)
            .await
            .and_then(|t| t.error)
            .filter(|e| !e.trim().is_empty())
    }
}
