//! Credential resolution.
//!
//! Turns stored plugin settings, optionally completed by a broker-issued
//! token, into the credential set used by the session handshake, and
//! reports configuration problems as diagnostics.

pub mod broker;
pub mod diagnostics;
pub mod resolver;
pub mod types;

pub use broker::{BrokerToken, CachingBroker, TokenBroker};
pub use diagnostics::{ConfigIssue, invalid_config, missing_broker_config, missing_config};
pub use resolver::CredentialResolver;
pub use types::{CredentialField, CredentialSet, FeatureFlags};
