//! Adapter lookup.
//!
//! # Responsibilities
//! - Store mounted adapters in registration order
//! - Look up the adapter for a URL by longest prefix
//! - Own the per-adapter concurrency semaphores
//!
//! # Design Decisions
//! - Mutated only through `&mut self`, before traffic starts
//! - O(n) prefix scan (acceptable for typical adapter counts)
//! - Ties go to the first registered adapter
//! - No match falls back to an all-defaults adapter without a limit

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::config::validation::ValidationError;
use crate::routing::adapter::AdapterConfig;
use crate::routing::matcher::PrefixMatcher;

#[derive(Debug)]
struct Mount {
    matcher: PrefixMatcher,
    config: AdapterConfig,
    permits: Arc<Semaphore>,
}

/// The adapter chosen for one URL.
#[derive(Debug, Clone, Copy)]
pub struct AdapterRoute<'a> {
    /// `None` when the fallback adapter was used.
    pub prefix: Option<&'a str>,
    pub config: &'a AdapterConfig,
    pub permits: Option<&'a Arc<Semaphore>>,
}

#[derive(Debug, Default)]
pub struct AdapterRouter {
    mounts: Vec<Mount>,
    fallback: AdapterConfig,
}

impl AdapterRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `config` at `prefix`. Re-mounting a prefix replaces its adapter
    /// but keeps its registration position.
    pub fn mount(&mut self, prefix: impl Into<String>, config: AdapterConfig) -> Result<(), ValidationError> {
        let prefix = prefix.into();
        config.validate().map_err(|e| ValidationError::Adapter {
            prefix: prefix.clone(),
            reason: e.to_string(),
        })?;

        let mount = Mount {
            permits: Arc::new(Semaphore::new(config.limit)),
            matcher: PrefixMatcher::new(prefix),
            config,
        };

        match self
            .mounts
            .iter_mut()
            .find(|existing| existing.matcher == mount.matcher)
        {
            Some(existing) => *existing = mount,
            None => self.mounts.push(mount),
        }
        Ok(())
    }

    pub fn resolve(&self, url: &str) -> AdapterRoute<'_> {
        let mut best: Option<&Mount> = None;
        for mount in &self.mounts {
            if !mount.matcher.matches(url) {
                continue;
            }
            if best.map_or(true, |b| mount.matcher.specificity() > b.matcher.specificity()) {
                best = Some(mount);
            }
        }

        match best {
            Some(mount) => AdapterRoute {
                prefix: Some(mount.matcher.prefix()),
                config: &mount.config,
                permits: Some(&mount.permits),
            },
            None => AdapterRoute {
                prefix: None,
                config: &self.fallback,
                permits: None,
            },
        }
    }

    /// Mounted prefixes in registration order.
    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.mounts.iter().map(|m| m.matcher.prefix())
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    pub fn clear(&mut self) {
        self.mounts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_prefix_wins() {
        let mut router = AdapterRouter::new();
        router.mount("https://", AdapterConfig::default()).unwrap();
        router
            .mount(
                "https://api.example.com/",
                AdapterConfig::default().with_header("X-Api", "1"),
            )
            .unwrap();

        let route = router.resolve("https://api.example.com/v1");
        assert_eq!(route.prefix, Some("https://api.example.com/"));
        assert_eq!(route.config.headers["X-Api"], "1");

        assert_eq!(router.resolve("https://other.example.com/").prefix, Some("https://"));
    }

    #[test]
    fn test_fallback_when_nothing_matches() {
        let router = AdapterRouter::new();
        let route = router.resolve("http://localhost/");
        assert!(route.prefix.is_none());
        assert!(route.permits.is_none());
        assert_eq!(route.config, &AdapterConfig::default());
    }

    #[test]
    fn test_remount_replaces_in_place() {
        let mut router = AdapterRouter::new();
        router.mount("http://", AdapterConfig::default()).unwrap();
        router.mount("https://", AdapterConfig::default()).unwrap();
        router
            .mount("http://", AdapterConfig::default().with_limits(5, 5))
            .unwrap();

        assert_eq!(router.prefixes().collect::<Vec<_>>(), vec!["http://", "https://"]);
        let route = router.resolve("http://x/");
        assert_eq!(route.config.limit, 5);
        assert_eq!(route.permits.unwrap().available_permits(), 5);
    }

    #[test]
    fn test_invalid_adapter_rejected() {
        let mut router = AdapterRouter::new();
        let err = router
            .mount("https://", AdapterConfig::default().with_limits(0, 1))
            .unwrap_err();
        assert!(matches!(err, ValidationError::Adapter { ref prefix, .. } if prefix == "https://"));
        assert!(router.is_empty());
    }
}
