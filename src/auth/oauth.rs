//! OAuth 2.0 client credentials and the tokens obtained with them.
//!
//! No token exchange happens here. A request hook or the caller refreshes
//! the token and installs it with [`OAuthCredential::with_tokens`].

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

#[derive(Clone, PartialEq, Deserialize, Serialize)]
pub struct OAuthCredential {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Expiry as seconds since the Unix epoch.
    #[serde(default)]
    pub expires_at: Option<u64>,
}

impl OAuthCredential {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: token_url.into(),
            scope: None,
            access_token: String::new(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Copy of this credential carrying freshly issued tokens.
    #[must_use]
    pub fn with_tokens(
        &self,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_at: Option<u64>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at,
            ..self.clone()
        }
    }

    pub fn has_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    /// True when there is no token or its expiry has passed.
    pub fn is_expired(&self) -> bool {
        if !self.has_token() {
            return true;
        }
        match self.expires_at {
            Some(deadline) => unix_now() >= deadline,
            None => false,
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl fmt::Debug for OAuthCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredential")
            .field("client_id", &self.client_id)
            .field("token_url", &self.token_url)
            .field("scope", &self.scope)
            .field("has_token", &self.has_token())
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}
