//! Remote content and report client.

pub mod client;
pub mod types;

pub use client::{RemoteClient, RemoteClientConfig};
pub use types::{
    ActivityEntry, ActivityType, DialogLineRef, DialogMetadata, LearnedLine, LearnedWord,
    RemoteId, RemoteProgressReport,
};

use serde_json::Value;

/// Versioned `Accept` media types understood by the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptVersion {
    V1,
    V2,
    V3,
    V4,
}

impl AcceptVersion {
    pub fn header_value(self) -> &'static str {
        match self {
            Self::V1 => "application/vnd.englishcentral-v1+json,application/json;q=0.9,*/*;q=0.8",
            Self::V2 => "application/vnd.englishcentral-v2+json,application/json;q=0.9,*/*;q=0.8",
            Self::V3 => "application/vnd.englishcentral-v3+json,application/json;q=0.9,*/*;q=0.8",
            Self::V4 => "application/vnd.englishcentral-v4+json,application/json;q=0.9,*/*;q=0.8",
        }
    }
}

/// Functional partitions of the remote API, one host each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subdomain {
    Bridge,
    ReportCard,
    Chat,
}

impl Subdomain {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bridge => "bridge",
            Self::ReportCard => "reportcard",
            Self::Chat => "chat",
        }
    }
}

/// Whether a body is structurally a JSON object or array.
pub fn looks_like_json(body: &str) -> bool {
    (body.starts_with('{') && body.ends_with('}')) || (body.starts_with('[') && body.ends_with(']'))
}

/// Response body: parsed JSON when it looks like JSON, raw text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteBody {
    Json(Value),
    Text(String),
    /// Transport failure or empty response.
    Empty,
}

impl RemoteBody {
    pub fn parse(text: String) -> Self {
        if text.is_empty() {
            return Self::Empty;
        }
        if looks_like_json(&text)
            && let Ok(value) = serde_json::from_str(&text)
        {
            return Self::Json(value);
        }
        Self::Text(text)
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_detection_is_structural() {
        assert!(looks_like_json("{}"));
        assert!(looks_like_json("[1,2]"));
        assert!(!looks_like_json("{\"a\":1"));
        assert!(!looks_like_json(" {}"));
        assert!(!looks_like_json("<!DOCTYPE html>"));
        assert!(!looks_like_json(""));
    }

    #[test]
    fn test_body_parse() {
        assert_eq!(RemoteBody::parse("{\"a\":1}".into()), RemoteBody::Json(json!({"a": 1})));
        assert_eq!(RemoteBody::parse("<html/>".into()), RemoteBody::Text("<html/>".into()));
        assert_eq!(RemoteBody::parse("{not json}".into()), RemoteBody::Text("{not json}".into()));
        assert!(RemoteBody::parse(String::new()).is_empty());
    }

    #[test]
    fn test_accept_versions_are_distinct() {
        assert!(AcceptVersion::V1.header_value().starts_with("application/vnd.englishcentral-v1+json"));
        assert!(AcceptVersion::V2.header_value().contains("-v2+json"));
        assert_ne!(AcceptVersion::V3.header_value(), AcceptVersion::V4.header_value());
    }
}
