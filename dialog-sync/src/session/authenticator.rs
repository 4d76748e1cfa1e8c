//! Session handshake with the remote service.
//!
//! Three values are derived in order, each at most once per authenticator:
//!
//! 1. the signed identity assertion (`{userID, consumerKey, exp}`),
//! 2. the exchanged access token returned by the authorize endpoint,
//! 3. the authorization header (`JWT ` + `{accessToken, consumerKey}` signed).
//!
//! A failed step leaves the earlier values in place and reports the error;
//! nothing is retried here.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use signed_token::{Algorithm, TokenError};
use tracing::{debug, instrument};

use super::identity::PseudonymousIdentity;
use super::language::{native_language, site_language};
use crate::config::HostContext;
use crate::credentials::CredentialSet;
use crate::remote::RemoteClient;
use crate::remote::client::AuthorizeForm;
use crate::{Error, Result};

/// Lifetime of an identity assertion.
pub const ASSERTION_TTL_SECS: i64 = 10_000;

/// Scheme label of the authorization header.
pub const AUTHORIZATION_SCHEME: &str = "JWT";

const ALLOWED: [Algorithm; 1] = [Algorithm::HS256];

/// Handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum AuthState {
    Unauthenticated,
    IdentitySigned,
    TokenExchanged,
    AuthorizationDerived,
}

#[derive(Debug, Serialize)]
struct IdentityClaims<'a> {
    #[serde(rename = "userID")]
    user_id: &'a str,
    #[serde(rename = "consumerKey")]
    consumer_key: &'a str,
    /// Epoch milliseconds.
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct AccessClaims {
    #[serde(rename = "accessToken")]
    access_token: String,
}

#[derive(Debug, Serialize)]
struct AuthorizationClaims<'a> {
    #[serde(rename = "accessToken")]
    access_token: &'a str,
    #[serde(rename = "consumerKey")]
    consumer_key: &'a str,
}

/// Settings handed to the browser player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSettings {
    #[serde(rename = "chatMode")]
    pub chat_mode: bool,
}

/// One request's session with the remote service.
pub struct SessionAuthenticator {
    client: Arc<RemoteClient>,
    credentials: CredentialSet,
    identity: PseudonymousIdentity,
    site_language: String,
    native_language: String,
    identity_assertion: Option<String>,
    exchanged_token: Option<String>,
    authorization: Option<String>,
}

impl SessionAuthenticator {
    pub fn new(
        client: Arc<RemoteClient>,
        credentials: CredentialSet,
        identity: PseudonymousIdentity,
        ctx: &HostContext,
    ) -> Self {
        Self {
            client,
            credentials,
            identity,
            site_language: site_language(&ctx.current_language),
            native_language: native_language(ctx),
            identity_assertion: None,
            exchanged_token: None,
            authorization: None,
        }
    }

    /// Start from a token the player already exchanged.
    pub fn with_exchanged_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        if !token.is_empty() {
            self.exchanged_token = Some(token);
            self.authorization = None;
        }
        self
    }

    pub fn state(&self) -> AuthState {
        if self.authorization.is_some() {
            AuthState::AuthorizationDerived
        } else if self.exchanged_token.is_some() {
            AuthState::TokenExchanged
        } else if self.identity_assertion.is_some() {
            AuthState::IdentitySigned
        } else {
            AuthState::Unauthenticated
        }
    }

    pub fn credentials(&self) -> &CredentialSet {
        &self.credentials
    }

    pub fn identity(&self) -> &PseudonymousIdentity {
        &self.identity
    }

    pub fn identity_mut(&mut self) -> &mut PseudonymousIdentity {
        &mut self.identity
    }

    pub fn site_language(&self) -> &str {
        &self.site_language
    }

    pub fn player_settings(&self) -> PlayerSettings {
        PlayerSettings {
            chat_mode: self.credentials.feature_flags.chat_mode,
        }
    }

    /// Signed `{userID, consumerKey, exp}` assertion.
    pub fn identity_assertion(&mut self) -> Result<String> {
        if let Some(assertion) = &self.identity_assertion {
            return Ok(assertion.clone());
        }
        let key = self.credentials.signing_key()?;
        let claims = IdentityClaims {
            user_id: &self.identity.external_id,
            consumer_key: &self.credentials.consumer_key,
            exp: (Utc::now().timestamp() + ASSERTION_TTL_SECS) * 1000,
        };
        let assertion = signed_token::encode(&claims, &key)?;
        debug!(user = %self.identity.external_id, "Signed identity assertion");
        self.identity_assertion = Some(assertion.clone());
        Ok(assertion)
    }

    /// Token returned by the authorize endpoint.
    ///
    /// The remote answers errors with an HTML or JSON body instead of a
    /// token; that body is returned as-is for the caller to diagnose.
    #[instrument(skip(self), fields(user = %self.identity.external_id))]
    pub async fn exchanged_token(&mut self) -> Result<String> {
        if let Some(token) = &self.exchanged_token {
            return Ok(token.clone());
        }
        let assertion = self.identity_assertion()?;
        let form = AuthorizeForm {
            partner_id: self.credentials.partner_id.clone(),
            site_language: self.site_language.clone(),
            native_language: self.native_language.clone(),
        };
        let token = self.client.authorize(&assertion, &form).await?;
        self.exchanged_token = Some(token.clone());
        Ok(token)
    }

    /// `Authorization` header for content and report calls.
    pub async fn authorization(&mut self) -> Result<String> {
        if let Some(header) = &self.authorization {
            return Ok(header.clone());
        }
        let exchanged = self.exchanged_token().await?;
        let key = self.credentials.signing_key()?;
        let access: AccessClaims = signed_token::decode_as(&exchanged, &key, &ALLOWED)?;
        if access.access_token.is_empty() {
            return Err(Error::Token(TokenError::InvalidPayload(
                "empty accessToken".to_string(),
            )));
        }
        let claims = AuthorizationClaims {
            access_token: &access.access_token,
            consumer_key: &self.credentials.consumer_key,
        };
        let header = format!("{AUTHORIZATION_SCHEME} {}", signed_token::encode(&claims, &key)?);
        self.authorization = Some(header.clone());
        Ok(header)
    }
}
