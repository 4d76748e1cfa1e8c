use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    MalformedToken(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("algorithm not allowed: {0}")]
    DisallowedAlgorithm(String),
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("encoding failed: {0}")]
    Encoding(String),
    #[error("payload does not match the expected shape: {0}")]
    InvalidPayload(String),
}

impl TokenError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedToken(reason.into())
    }
}
