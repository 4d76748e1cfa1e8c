//! HMAC-signed compact tokens.
//!
//! Thin layer over `jsonwebtoken` that keeps the wire format of the standard
//! compact serialization while making the failure modes explicit:
//! malformed structure, bad signature, expiry and algorithm allow-listing.

pub mod codec;
pub mod error;
pub mod key;

pub use codec::{DEFAULT_ALGORITHM, decode, decode_as, decode_at, encode, encode_with, is_compact};
pub use error::TokenError;
pub use jsonwebtoken::Algorithm;
pub use key::SigningKey;
