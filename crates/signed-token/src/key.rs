use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use jsonwebtoken::{DecodingKey, EncodingKey};

use crate::error::TokenError;

/// Lenient URL-safe decoder: padding optional, trailing bits ignored.
const LENIENT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Symmetric key shared with the remote service.
#[derive(Clone)]
pub struct SigningKey {
    bytes: Vec<u8>,
}

impl SigningKey {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Decode a stored secret written in URL-safe base64.
    ///
    /// Standard-alphabet characters (`+`, `/`) and `=` padding are accepted as
    /// well, so secrets copied from either encoding decode to the same bytes.
    pub fn from_url_safe_base64(encoded: &str) -> Result<Self, TokenError> {
        let normalized: String = encoded
            .trim()
            .trim_end_matches('=')
            .chars()
            .map(|c| match c {
                '+' => '-',
                '/' => '_',
                other => other,
            })
            .collect();
        if normalized.is_empty() {
            return Err(TokenError::InvalidKey("empty secret".to_string()));
        }
        let bytes = LENIENT_URL_SAFE
            .decode(normalized.as_bytes())
            .map_err(|e| TokenError::InvalidKey(e.to_string()))?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(&self.bytes)
    }

    pub(crate) fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(&self.bytes)
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("len", &self.bytes.len())
            .finish()
    }
}
