//! URL prefix matching.
//!
//! # Design Decisions
//! - Plain string prefix, case-sensitive, no normalization
//! - No regex to guarantee O(n) matching
//! - Empty prefix = always matches (wildcard)

/// Matches URLs that start with a fixed prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixMatcher {
    prefix: String,
}

impl PrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn matches(&self, url: &str) -> bool {
        url.starts_with(&self.prefix)
    }

    /// Specificity of the match; longer wins.
    pub fn specificity(&self) -> usize {
        self.prefix.len()
    }
}
