//! Compact token encoding and verification.
//!
//! Tokens are three base64url segments joined by `.`: a JSON header, a JSON
//! payload and an HMAC signature over the first two segments.

use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Header, Validation};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::TokenError;
use crate::key::SigningKey;

/// Algorithm used by [`encode`].
pub const DEFAULT_ALGORITHM: Algorithm = Algorithm::HS256;

fn is_hmac(alg: Algorithm) -> bool {
    matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

/// Sign `payload` with HS256.
pub fn encode<T: Serialize>(payload: &T, key: &SigningKey) -> Result<String, TokenError> {
    encode_with(payload, key, DEFAULT_ALGORITHM)
}

/// Sign `payload` with an explicit HMAC algorithm.
pub fn encode_with<T: Serialize>(
    payload: &T,
    key: &SigningKey,
    alg: Algorithm,
) -> Result<String, TokenError> {
    if !is_hmac(alg) {
        return Err(TokenError::DisallowedAlgorithm(format!("{alg:?}")));
    }
    jsonwebtoken::encode(&Header::new(alg), payload, &key.encoding_key())
        .map_err(|e| TokenError::Encoding(e.to_string()))
}

/// Verify `token` and return its payload as JSON.
pub fn decode(
    token: &str,
    key: &SigningKey,
    allowed: &[Algorithm],
) -> Result<Value, TokenError> {
    decode_at(token, key, allowed, unix_now_secs())
}

/// Verify `token` and deserialize its payload into `T`.
pub fn decode_as<T: DeserializeOwned>(
    token: &str,
    key: &SigningKey,
    allowed: &[Algorithm],
) -> Result<T, TokenError> {
    let value = decode(token, key, allowed)?;
    serde_json::from_value(value).map_err(|e| TokenError::InvalidPayload(e.to_string()))
}

/// Same as [`decode`] with an explicit "now" in unix seconds.
pub fn decode_at(
    token: &str,
    key: &SigningKey,
    allowed: &[Algorithm],
    now_secs: f64,
) -> Result<Value, TokenError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::malformed(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }
    if segments.iter().any(|s| s.is_empty()) {
        return Err(TokenError::malformed("empty segment"));
    }

    let alg = header_algorithm(segments[0])?;
    if !is_hmac(alg) || !allowed.contains(&alg) {
        return Err(TokenError::DisallowedAlgorithm(format!("{alg:?}")));
    }

    if URL_SAFE_NO_PAD.decode(segments[2]).is_err() {
        return Err(TokenError::InvalidSignature);
    }

    let mut validation = Validation::new(alg);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = jsonwebtoken::decode::<Value>(token.trim(), &key.decoding_key(), &validation)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::InvalidAlgorithm => TokenError::DisallowedAlgorithm(format!("{alg:?}")),
            _ => TokenError::malformed(e.to_string()),
        })?;

    if let Some(exp) = data.claims.get("exp").and_then(Value::as_f64)
        && exp < now_secs
    {
        return Err(TokenError::Expired);
    }

    Ok(data.claims)
}

/// Whether `token` has the three-segment compact shape. Does not verify.
pub fn is_compact(token: &str) -> bool {
    let segments: Vec<&str> = token.split('.').collect();
    segments.len() == 3 && segments.iter().all(|s| !s.is_empty())
}

fn header_algorithm(segment: &str) -> Result<Algorithm, TokenError> {
    let raw = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| TokenError::malformed(format!("header: {e}")))?;
    let header: Value = serde_json::from_slice(&raw)
        .map_err(|e| TokenError::malformed(format!("header: {e}")))?;
    let name = header
        .get("alg")
        .and_then(Value::as_str)
        .ok_or_else(|| TokenError::malformed("header has no alg"))?;
    Algorithm::from_str(name).map_err(|_| TokenError::DisallowedAlgorithm(name.to_string()))
}

fn unix_now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn key() -> SigningKey {
        SigningKey::from_bytes(b"0123456789abcdef0123456789abcdef".to_vec())
    }

    fn tamper_signature(token: &str) -> String {
        let (head, sig) = token.rsplit_once('.').unwrap();
        let mut chars: Vec<char> = sig.chars().collect();
        chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
        format!("{head}.{}", chars.into_iter().collect::<String>())
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let payload = json!({"userID": "42", "consumerKey": "abc"});
        let token = encode(&payload, &key()).unwrap();
        let decoded = decode(&token, &key(), &[Algorithm::HS256]).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_header_is_standard_jwt() {
        let token = encode(&json!({"a": 1}), &key()).unwrap();
        let header = token.split('.').next().unwrap();
        let raw = URL_SAFE_NO_PAD.decode(header).unwrap();
        let value: Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(value["alg"], "HS256");
        assert_eq!(value["typ"], "JWT");
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let payload = json!({"accessToken": "t", "consumerKey": "k"});
        let a = encode(&payload, &key()).unwrap();
        let b = encode(&payload, &key()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_expired_token_rejected() {
        let payload = json!({"exp": 1_000});
        let token = encode(&payload, &key()).unwrap();
        let result = decode_at(&token, &key(), &[Algorithm::HS256], 2_000.0);
        assert_eq!(result, Err(TokenError::Expired));
    }

    #[test]
    fn test_future_expiry_accepted() {
        let payload = json!({"exp": 5_000});
        let token = encode(&payload, &key()).unwrap();
        assert!(decode_at(&token, &key(), &[Algorithm::HS256], 2_000.0).is_ok());
    }

    #[test]
    fn test_missing_exp_never_expires() {
        let token = encode(&json!({"sub": "x"}), &key()).unwrap();
        assert!(decode_at(&token, &key(), &[Algorithm::HS256], f64::MAX).is_ok());
    }

    #[test]
    fn test_wrong_key_is_invalid_signature() {
        let token = encode(&json!({"a": 1}), &key()).unwrap();
        let other = SigningKey::from_bytes(b"another-key".to_vec());
        assert_eq!(
            decode(&token, &other, &[Algorithm::HS256]),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let token = encode(&json!({"a": 1}), &key()).unwrap();
        let tampered = tamper_signature(&token);
        assert_eq!(
            decode(&tampered, &key(), &[Algorithm::HS256]),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_malformed_structure() {
        for bad in ["", "abc", "a.b", "a..c", "a.b.c.d", ".b.c"] {
            assert!(
                matches!(
                    decode(bad, &key(), &[Algorithm::HS256]),
                    Err(TokenError::MalformedToken(_))
                ),
                "{bad:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_algorithm_not_in_allowed_list() {
        let token = encode_with(&json!({"a": 1}), &key(), Algorithm::HS512).unwrap();
        assert!(matches!(
            decode(&token, &key(), &[Algorithm::HS256]),
            Err(TokenError::DisallowedAlgorithm(_))
        ));
        assert!(decode(&token, &key(), &[Algorithm::HS256, Algorithm::HS512]).is_ok());
    }

    #[test]
    fn test_none_algorithm_rejected() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(br#"{"a":1}"#);
        let token = format!("{header}.{body}.c2ln");
        assert!(matches!(
            decode(&token, &key(), &[Algorithm::HS256]),
            Err(TokenError::DisallowedAlgorithm(_))
        ));
    }

    #[test]
    fn test_asymmetric_algorithm_cannot_be_used() {
        assert!(matches!(
            encode_with(&json!({}), &key(), Algorithm::RS256),
            Err(TokenError::DisallowedAlgorithm(_))
        ));
    }

    #[test]
    fn test_decode_as_typed_payload() {
        #[derive(Debug, Deserialize, PartialEq)]
        #[serde(rename_all = "camelCase")]
        struct Inner {
            access_token: String,
        }
        let token = encode(&json!({"accessToken": "xyz", "extra": true}), &key()).unwrap();
        let inner: Inner = decode_as(&token, &key(), &[Algorithm::HS256]).unwrap();
        assert_eq!(inner.access_token, "xyz");

        let wrong: Result<Inner, _> = decode_as(
            &encode(&json!({"other": 1}), &key()).unwrap(),
            &key(),
            &[Algorithm::HS256],
        );
        assert!(matches!(wrong, Err(TokenError::InvalidPayload(_))));
    }

    #[test]
    fn test_is_compact() {
        assert!(is_compact("a.b.c"));
        assert!(!is_compact("a.b"));
        assert!(!is_compact("a..c"));
    }
}
