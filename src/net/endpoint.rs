//! Base URL handling.

use std::fmt;

use url::Url;

use crate::config::validation::ValidationError;

/// The base URL a client is bound to. Only `http` and `https` are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let url = Url::parse(raw)
            .map_err(|e| ValidationError::Endpoint(format!("'{raw}' is not a valid URL: {e}")))?;
        check_scheme(&url, raw).map_err(ValidationError::Endpoint)?;
        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Resolve a request target. A leading `/` is appended to the endpoint;
    /// anything else must be an absolute http(s) URL.
    pub fn resolve(&self, target: &str) -> Result<Url, ValidationError> {
        if target.starts_with('/') {
            let joined = format!("{}{}", self.url.as_str().trim_end_matches('/'), target);
            return Url::parse(&joined)
                .map_err(|e| ValidationError::Endpoint(format!("cannot resolve '{target}': {e}")));
        }
        let url = Url::parse(target)
            .map_err(|e| ValidationError::Endpoint(format!("'{target}' is not a valid URL: {e}")))?;
        check_scheme(&url, target).map_err(ValidationError::Endpoint)?;
        Ok(url)
    }
}

fn check_scheme(url: &Url, raw: &str) -> Result<(), String> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme '{other}' in '{raw}'")),
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}
