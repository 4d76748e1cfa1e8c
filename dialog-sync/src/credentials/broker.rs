//! Token broker collaborator.
//!
//! The broker issues a short-lived signed blob whose custom properties may
//! carry the credential fields. It is owned by the embedding host; this
//! module only defines the seam and a caching wrapper.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Token returned by the broker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerToken {
    pub token: String,
    #[serde(default)]
    pub custom_properties: HashMap<String, String>,
    /// Error text reported by the broker instead of a usable token.
    #[serde(default)]
    pub error: Option<String>,
}

impl BrokerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Default::default()
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_properties.insert(name.into(), value.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Non-empty custom property value.
    pub fn custom_property(&self, name: &str) -> Option<&str> {
        self.custom_properties
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn is_error(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.trim().is_empty())
    }
}

/// Source of broker tokens.
#[async_trait]
pub trait TokenBroker: Send + Sync {
    /// Fetch a token for the broker account. `force_refresh` bypasses caches.
    /// Transport failures yield `None`.
    async fn fetch_token(&self, user: &str, secret: &str, force_refresh: bool) -> Option<BrokerToken>;
}

/// Caches tokens per broker account.
pub struct CachingBroker<B: TokenBroker> {
    inner: B,
    cache: Mutex<HashMap<(String, String), BrokerToken>>,
}

impl<B: TokenBroker> CachingBroker<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn invalidate(&self, user: &str) {
        self.cache.lock().retain(|(u, _), _| u != user);
    }
}

#[async_trait]
impl<B: TokenBroker> TokenBroker for CachingBroker<B> {
    async fn fetch_token(&self, user: &str, secret: &str, force_refresh: bool) -> Option<BrokerToken> {
        let key = (user.to_string(), secret.to_string());
        if !force_refresh {
            let cached = self.cache.lock().get(&key).cloned();
            if let Some(token) = cached {
                debug!(user, "Using cached broker token");
                return Some(token);
            }
        }

        let token = self.inner.fetch_token(user, secret, force_refresh).await;
        match &token {
            Some(t) if !t.is_error() => {
                self.cache.lock().insert(key, t.clone());
            }
            _ => {
                self.cache.lock().remove(&key);
            }
        }
        token
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Broker returning a fixed token and counting calls.
    pub(crate) struct StaticBroker {
        pub token: Option<BrokerToken>,
        pub calls: AtomicUsize,
        pub forced: AtomicUsize,
    }

    impl StaticBroker {
        pub(crate) fn new(token: Option<BrokerToken>) -> Self {
            Self {
                token,
                calls: AtomicUsize::new(0),
                forced: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TokenBroker for StaticBroker {
        async fn fetch_token(&self, _user: &str, _secret: &str, force_refresh: bool) -> Option<BrokerToken> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if force_refresh {
                self.forced.fetch_add(1, Ordering::SeqCst);
            }
            self.token.clone()
        }
    }

    #[tokio::test]
    async fn test_caching_broker_reuses_token() {
        let broker = CachingBroker::new(StaticBroker::new(Some(BrokerToken::new("t"))));
        broker.fetch_token("u", "s", false).await.unwrap();
        broker.fetch_token("u", "s", false).await.unwrap();
        assert_eq!(broker.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_cache() {
        let broker = CachingBroker::new(StaticBroker::new(Some(BrokerToken::new("t"))));
        broker.fetch_token("u", "s", false).await.unwrap();
        broker.fetch_token("u", "s", true).await.unwrap();
        assert_eq!(broker.inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(broker.inner.forced.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_tokens_are_not_cached() {
        let broker = CachingBroker::new(StaticBroker::new(Some(
            BrokerToken::new("").with_error("bad secret"),
        )));
        broker.fetch_token("u", "s", false).await.unwrap();
        broker.fetch_token("u", "s", false).await.unwrap();
        assert_eq!(broker.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_drops_entry() {
        let broker = CachingBroker::new(StaticBroker::new(Some(BrokerToken::new("t"))));
        broker.fetch_token("u", "s", false).await.unwrap();
        broker.invalidate("u");
        broker.fetch_token("u", "s", false).await.unwrap();
        assert_eq!(broker.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_blank_property_is_absent() {
        let token = BrokerToken::new("t").with_property("a", " ").with_property("b", "x");
        assert_eq!(token.custom_property("a"), None);
        assert_eq!(token.custom_property("b"), Some("x"));
        assert_eq!(token.custom_property("c"), None);
    }
}
