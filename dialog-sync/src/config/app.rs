//! Process configuration loaded from the environment.

use std::path::PathBuf;
use std::time::Duration;

use super::plugin::{PRODUCTION_DOMAIN, PluginConfig, QA_DOMAIN};
use crate::logging::DEFAULT_LOG_FILTER;

/// Process-level settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub log_filter: String,
    /// Write a daily-rolling log file here when set.
    pub log_dir: Option<PathBuf>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub production_domain: String,
    pub qa_domain: String,
    /// Replace `https://<subdomain>.<domain>` with `<base>/<subdomain>`.
    pub remote_base_url: Option<String>,
    /// Stored plugin settings.
    pub plugin: PluginConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:dialog-sync.db?mode=rwc".to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_dir: None,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            production_domain: PRODUCTION_DOMAIN.to_string(),
            qa_domain: QA_DOMAIN.to_string(),
            remote_base_url: None,
            plugin: PluginConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from the process environment, falling back to defaults.
    ///
    /// Supported env vars:
    /// - `DATABASE_URL`
    /// - `DIALOG_SYNC_LOG_FILTER`, `DIALOG_SYNC_LOG_DIR`
    /// - `DIALOG_SYNC_CONNECT_TIMEOUT_SECS`, `DIALOG_SYNC_READ_TIMEOUT_SECS`
    /// - `DIALOG_SYNC_PRODUCTION_DOMAIN`, `DIALOG_SYNC_QA_DOMAIN`, `DIALOG_SYNC_REMOTE_BASE_URL`
    /// - `DIALOG_SYNC_BROKER_USER`, `DIALOG_SYNC_BROKER_SECRET`
    /// - `DIALOG_SYNC_PARTNER_ID`, `DIALOG_SYNC_CONSUMER_KEY`,
    ///   `DIALOG_SYNC_CONSUMER_SECRET`, `DIALOG_SYNC_ENCRYPTED_SECRET`
    /// - `DIALOG_SYNC_CHAT_MODE`, `DIALOG_SYNC_DEVELOPMENT_MODE`, `DIALOG_SYNC_PLAYER_VERSION`
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let flag = |name: &str| {
            var(name)
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(false)
        };
        let secs = |name: &str| {
            var(name)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
        };

        let mut config = Self::default();

        if let Some(url) = var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(filter) = var("DIALOG_SYNC_LOG_FILTER") {
            config.log_filter = filter;
        }
        config.log_dir = var("DIALOG_SYNC_LOG_DIR").map(PathBuf::from);
        if let Some(timeout) = secs("DIALOG_SYNC_CONNECT_TIMEOUT_SECS") {
            config.connect_timeout = timeout;
        }
        if let Some(timeout) = secs("DIALOG_SYNC_READ_TIMEOUT_SECS") {
            config.read_timeout = timeout;
        }
        if let Some(domain) = var("DIALOG_SYNC_PRODUCTION_DOMAIN") {
            config.production_domain = domain;
        }
        if let Some(domain) = var("DIALOG_SYNC_QA_DOMAIN") {
            config.qa_domain = domain;
        }
        config.remote_base_url = var("DIALOG_SYNC_REMOTE_BASE_URL");

        config.plugin = PluginConfig {
            broker_user: var("DIALOG_SYNC_BROKER_USER").unwrap_or_default(),
            broker_secret: var("DIALOG_SYNC_BROKER_SECRET").unwrap_or_default(),
            partner_id: var("DIALOG_SYNC_PARTNER_ID").unwrap_or_default(),
            consumer_key: var("DIALOG_SYNC_CONSUMER_KEY").unwrap_or_default(),
            consumer_secret: var("DIALOG_SYNC_CONSUMER_SECRET").unwrap_or_default(),
            encrypted_secret: var("DIALOG_SYNC_ENCRYPTED_SECRET").unwrap_or_default(),
            chat_mode: flag("DIALOG_SYNC_CHAT_MODE"),
            development_mode: flag("DIALOG_SYNC_DEVELOPMENT_MODE"),
            player_version: var("DIALOG_SYNC_PLAYER_VERSION").unwrap_or_default(),
            ..PluginConfig::default()
        };

        config
    }

    /// Remote domain selected by the plugin's development mode.
    pub fn domain(&self) -> &str {
        if self.plugin.development_mode {
            &self.qa_domain
        } else {
            &self.production_domain
        }
    }
}
