//! JWT bearer tokens with best-effort claim decoding.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A JWT sent as a bearer-style header. Claims are decoded once, without
/// signature verification, and are empty when the payload is unreadable.
#[derive(Clone, PartialEq, Deserialize, Serialize)]
#[serde(from = "RawJwt", into = "RawJwt")]
pub struct JwtToken {
    token: String,
    scheme: String,
    claims: Map<String, Value>,
}

#[derive(Deserialize, Serialize)]
struct RawJwt {
    token: String,
    #[serde(default = "default_scheme")]
    scheme: String,
}

fn default_scheme() -> String {
    "Bearer".to_string()
}

impl From<RawJwt> for JwtToken {
    fn from(raw: RawJwt) -> Self {
        JwtToken::with_scheme(raw.token, raw.scheme)
    }
}

impl From<JwtToken> for RawJwt {
    fn from(jwt: JwtToken) -> Self {
        RawJwt {
            token: jwt.token,
            scheme: jwt.scheme,
        }
    }
}

impl JwtToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_scheme(token, default_scheme())
    }

    pub fn with_scheme(token: impl Into<String>, scheme: impl Into<String>) -> Self {
        let token = token.into();
        let claims = decode_claims(&token);
        Self {
            token,
            scheme: scheme.into(),
            claims,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    pub fn header_value(&self) -> String {
        format!("{} {}", self.scheme, self.token)
    }
}

impl fmt::Debug for JwtToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtToken")
            .field("scheme", &self.scheme)
            .field("claims", &self.claims)
            .finish_non_exhaustive()
    }
}

fn decode_claims(token: &str) -> Map<String, Value> {
    let Some(payload) = token.split('.').nth(1) else {
        return Map::new();
    };
    URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()
        .and_then(|raw| serde_json::from_slice::<Value>(&raw).ok())
        .and_then(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_default()
}
