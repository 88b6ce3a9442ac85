//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ClientConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ClientConfig, ConfigError> {
    let config: ClientConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credential;

    const FULL: &str = r#"
endpoint = "https://api.example.com"

[retry]
attempts = 2
backoff_factor = 0.5
retryable_statuses = [502, 503]

[timeout]
connect = 2.0
read = 10.0
write = 5.0
total = 15.0

[headers]
User-Agent = "crawl-client/0.1"

[auth]
type = "bearer"
token = "abc"

[[adapters]]
prefix = "https://api.example.com/v2/"
pool = 20
limit = 40

[adapters.headers]
X-Api-Version = "2"
"#;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(FULL).unwrap();
        assert_eq!(config.retry.attempts, 2);
        assert!(config.retry.retryable_statuses.contains(&502));
        assert_eq!(config.timeout.total, 15.0);
        assert_eq!(config.headers["User-Agent"], "crawl-client/0.1");
        assert!(matches!(config.auth, Some(Credential::Bearer { .. })));
        assert_eq!(config.adapters.len(), 1);
        assert_eq!(config.adapters[0].adapter.pool, 20);
        assert_eq!(config.adapters[0].adapter.headers["X-Api-Version"], "2");
    }

    #[test]
    fn test_validation_failure_is_reported() {
        let err = parse_config(r#"endpoint = "gopher://example.com""#).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert!(err.to_string().contains("gopher"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
