//! Configuration diagnostics shown at the page entry.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::types::{CredentialField, CredentialSet};
use crate::config::PluginConfig;
use crate::remote::looks_like_json;

static PARTNER_ID: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^[0-9]+$").ok());
static CONSUMER_KEY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{32}$").ok());
static CONSUMER_SECRET: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{64}$").ok());
static ENCRYPTED_SECRET: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[0-9a-zA-Z/+=]+$").ok());

/// Shape of a usable exchanged token: three segments, 180 to 200 characters.
static EXCHANGED_TOKEN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[0-9a-zA-Z._-]{180,200}$").ok());

static HTML_HEAD: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)^.*?<body[^>]*>").ok());
static HTML_TAIL: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?is)</body>.*$").ok());

fn is_match(pattern: &LazyLock<Option<Regex>>, value: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(value))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Missing,
    Invalid,
}

/// One credential field that blocks remote calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfigIssue {
    pub field: CredentialField,
    pub kind: IssueKind,
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            IssueKind::Missing => write!(f, "{} is missing", self.field.label()),
            IssueKind::Invalid => write!(f, "{} is invalid", self.field.label()),
        }
    }
}

/// Broker account settings that are blank.
pub fn missing_broker_config(config: &PluginConfig) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if config.broker_user.trim().is_empty() {
        missing.push("broker_user");
    }
    if config.broker_secret.trim().is_empty() {
        missing.push("broker_secret");
    }
    missing
}

/// Credential fields that are empty or fail their format check.
///
/// A consumer secret equal to the (non-empty) encrypted secret is accepted.
pub fn missing_config(credentials: &CredentialSet) -> Vec<ConfigIssue> {
    CredentialField::ALL
        .into_iter()
        .filter_map(|field| {
            let value = credentials.get(field);
            if value.trim().is_empty() {
                return Some(ConfigIssue {
                    field,
                    kind: IssueKind::Missing,
                });
            }
            let valid = match field {
                CredentialField::PartnerId => is_match(&PARTNER_ID, value),
                CredentialField::ConsumerKey => is_match(&CONSUMER_KEY, value),
                CredentialField::ConsumerSecret => {
                    value == credentials.encrypted_secret || is_match(&CONSUMER_SECRET, value)
                }
                CredentialField::EncryptedSecret => is_match(&ENCRYPTED_SECRET, value),
            };
            (!valid).then_some(ConfigIssue {
                field,
                kind: IssueKind::Invalid,
            })
        })
        .collect()
}

/// Explain why an exchanged token is unusable; `None` when it looks valid.
///
/// Tried in order: the remote JSON error envelope's `log` field, the inner
/// body of an HTML page, then the raw text.
pub fn invalid_config(exchanged_token: &str) -> Option<String> {
    if is_match(&EXCHANGED_TOKEN, exchanged_token) {
        return None;
    }

    if looks_like_json(exchanged_token)
        && let Ok(value) = serde_json::from_str::<serde_json::Value>(exchanged_token)
        && let Some(log) = value.get("log").and_then(|v| v.as_str())
    {
        return Some(log.to_string());
    }

    if is_html_document(exchanged_token) {
        return Some(strip_html_scaffold(exchanged_token));
    }

    Some(exchanged_token.to_string())
}

fn is_html_document(text: &str) -> bool {
    let head: String = text.trim_start().chars().take(14).collect();
    head.eq_ignore_ascii_case("<!doctype html")
}

fn strip_html_scaffold(html: &str) -> String {
    let mut body = html.to_string();
    if let Some(re) = HTML_HEAD.as_ref() {
        body = re.replace(&body, "").into_owned();
    }
    if let Some(re) = HTML_TAIL.as_ref() {
        body = re.replace(&body, "").into_owned();
    }
    body.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_set() -> CredentialSet {
        CredentialSet {
            partner_id: "1234".to_string(),
            consumer_key: "0123456789abcdef0123456789ABCDEF".to_string(),
            consumer_secret: "a".repeat(64),
            encrypted_secret: "c2VjcmV0+/==".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config_has_no_issues() {
        assert!(missing_config(&valid_set()).is_empty());
    }

    #[test]
    fn test_missing_and_invalid_are_reported_together() {
        let set = CredentialSet {
            partner_id: String::new(),
            consumer_key: "not-hex".to_string(),
            ..valid_set()
        };
        let issues = missing_config(&set);
        assert_eq!(
            issues,
            vec![
                ConfigIssue {
                    field: CredentialField::PartnerId,
                    kind: IssueKind::Missing
                },
                ConfigIssue {
                    field: CredentialField::ConsumerKey,
                    kind: IssueKind::Invalid
                },
            ]
        );
        assert_eq!(issues[0].to_string(), "Partner ID is missing");
    }

    #[test]
    fn test_consumer_secret_equal_to_encrypted_secret_is_accepted() {
        let set = CredentialSet {
            consumer_secret: "c2VjcmV0+/==".to_string(),
            ..valid_set()
        };
        assert!(missing_config(&set).is_empty());
    }

    #[test]
    fn test_missing_broker_config() {
        let mut config = PluginConfig::default();
        assert_eq!(missing_broker_config(&config), vec!["broker_user", "broker_secret"]);
        config.broker_user = "u".to_string();
        config.broker_secret = "s".to_string();
        assert!(missing_broker_config(&config).is_empty());
    }

    #[test]
    fn test_well_formed_token_is_valid() {
        let token = format!("{}.{}.{}", "a".repeat(36), "B".repeat(100), "c_-".repeat(17));
        assert!(token.len() >= 180 && token.len() <= 200);
        assert_eq!(invalid_config(&token), None);
    }

    #[test]
    fn test_json_envelope_reports_log() {
        let body = r#"{"log":"Invalid partnerID","status":403}"#;
        assert_eq!(invalid_config(body).as_deref(), Some("Invalid partnerID"));
    }

    #[test]
    fn test_json_without_log_reports_raw_text() {
        let body = r#"{"status":403}"#;
        assert_eq!(invalid_config(body).as_deref(), Some(body));
    }

    #[test]
    fn test_html_page_reports_inner_body() {
        let page = "<!DOCTYPE html>\n<html><head><title>Error</title></head>\n<body class=\"err\"><h1>404 Not Found</h1>\n<p>No such endpoint</p></body>\n</html>\n";
        assert_eq!(
            invalid_config(page).as_deref(),
            Some("<h1>404 Not Found</h1>\n<p>No such endpoint</p>")
        );
    }

    #[test]
    fn test_other_text_is_reported_verbatim() {
        assert_eq!(invalid_config("").as_deref(), Some(""));
        assert_eq!(invalid_config("Bad Gateway").as_deref(), Some("Bad Gateway"));
    }
}
