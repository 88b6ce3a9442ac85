//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! EffectiveConfig.auth (request > adapter > session default)
//!     → Credential::apply(headers, params)
//!         Basic   → Authorization: Basic base64(user:pass)
//!         Bearer  → Authorization: {scheme} {token}
//!         Jwt     → Authorization: {scheme} {token}   (claims decoded at construction)
//!         ApiKey  → {name}: {value}   or   ?{name}={value}
//!         OAuth   → Authorization: Bearer {access_token}   (only when a token is present)
//!     → request hook → transport
//! ```
//!
//! # Design Decisions
//! - Closed enum dispatched by `match`; no trait objects
//! - `apply` is pure and infallible; bad credentials are caught by `validate`
//! - Debug output never contains secrets

pub mod jwt;
pub mod oauth;

use std::collections::HashMap;
use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::config::validation::ValidationError;
use crate::session::merge::set_header;

pub use jwt::JwtToken;
pub use oauth::OAuthCredential;

const AUTHORIZATION: &str = "Authorization";

/// Where an API key is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyPlacement {
    #[default]
    Header,
    Query,
}

/// A credential attached to outgoing requests.
#[derive(Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credential {
    Basic {
        user: String,
        password: String,
    },
    Bearer {
        token: String,
        #[serde(default = "default_scheme")]
        scheme: String,
    },
    Jwt(JwtToken),
    ApiKey {
        value: String,
        #[serde(default)]
        placement: KeyPlacement,
        #[serde(default = "default_key_name")]
        name: String,
    },
    #[serde(rename = "oauth")]
    OAuth(OAuthCredential),
}

fn default_scheme() -> String {
    "Bearer".to_string()
}

fn default_key_name() -> String {
    "X-API-Key".to_string()
}

impl Credential {
    pub fn basic(user: impl Into<String>, password: impl Into<String>) -> Self {
        Credential::Basic {
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Credential::Bearer {
            token: token.into(),
            scheme: default_scheme(),
        }
    }

    pub fn jwt(token: impl Into<String>) -> Self {
        Credential::Jwt(JwtToken::new(token))
    }

    pub fn api_key(value: impl Into<String>) -> Self {
        Credential::ApiKey {
            value: value.into(),
            placement: KeyPlacement::Header,
            name: default_key_name(),
        }
    }

    pub fn api_key_in_query(value: impl Into<String>, name: impl Into<String>) -> Self {
        Credential::ApiKey {
            value: value.into(),
            placement: KeyPlacement::Query,
            name: name.into(),
        }
    }

    /// Add this credential's contribution to the outgoing headers or query.
    pub fn apply(&self, headers: &mut HashMap<String, String>, params: &mut Vec<(String, String)>) {
        match self {
            Credential::Basic { user, password } => {
                let encoded = STANDARD.encode(format!("{user}:{password}"));
                set_header(headers, AUTHORIZATION, format!("Basic {encoded}"));
            }
            Credential::Bearer { token, scheme } => {
                set_header(headers, AUTHORIZATION, format!("{scheme} {token}"));
            }
            Credential::Jwt(jwt) => {
                set_header(headers, AUTHORIZATION, jwt.header_value());
            }
            Credential::ApiKey {
                value,
                placement,
                name,
            } => match placement {
                KeyPlacement::Header => set_header(headers, name, value.clone()),
                KeyPlacement::Query => {
                    params.retain(|(key, _)| key != name);
                    params.push((name.clone(), value.clone()));
                }
            },
            Credential::OAuth(oauth) => {
                if oauth.has_token() {
                    set_header(headers, AUTHORIZATION, format!("Bearer {}", oauth.access_token));
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Credential::Bearer { scheme, .. } if scheme.trim().is_empty() => {
                Err(ValidationError::Auth("bearer scheme cannot be empty".into()))
            }
            Credential::Jwt(jwt) if jwt.scheme().trim().is_empty() => {
                Err(ValidationError::Auth("JWT scheme cannot be empty".into()))
            }
            Credential::ApiKey { name, .. } if name.trim().is_empty() => {
                Err(ValidationError::Auth("API key name cannot be empty".into()))
            }
            Credential::OAuth(oauth) if oauth.client_id.is_empty() || oauth.token_url.is_empty() => {
                Err(ValidationError::Auth(
                    "OAuth client id and token URL are required".into(),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Short name of the variant, safe to log.
    pub fn kind(&self) -> &'static str {
        match self {
            Credential::Basic { .. } => "basic",
            Credential::Bearer { .. } => "bearer",
            Credential::Jwt(_) => "jwt",
            Credential::ApiKey { .. } => "api_key",
            Credential::OAuth(_) => "oauth",
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Basic { user, .. } => f
                .debug_struct("Basic")
                .field("user", user)
                .finish_non_exhaustive(),
            Credential::Bearer { scheme, .. } => f
                .debug_struct("Bearer")
                .field("scheme", scheme)
                .finish_non_exhaustive(),
            Credential::Jwt(jwt) => f.debug_tuple("Jwt").field(jwt).finish(),
            Credential::ApiKey {
                placement, name, ..
            } => f
                .debug_struct("ApiKey")
                .field("placement", placement)
                .field("name", name)
                .finish_non_exhaustive(),
            Credential::OAuth(oauth) => f.debug_tuple("OAuth").field(oauth).finish(),
        }
    }
}
