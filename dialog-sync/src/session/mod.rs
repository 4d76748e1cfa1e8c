//! Remote session: pseudonymous identity and the authentication handshake.

pub mod authenticator;
pub mod identity;
pub mod language;

pub use authenticator::{AuthState, PlayerSettings, SessionAuthenticator};
pub use identity::{IdentityService, PseudonymousIdentity};
pub use language::{native_language, site_language};
