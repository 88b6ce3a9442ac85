//! Request and response hooks.
//!
//! Hooks observe each request after auth is applied and each response after
//! its body is cached. They are awaited inline and never cancelled. A hook
//! error is reported as a `HookFailed` event; the request carries on.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::http::request::Method;
use crate::http::response::Response;
use crate::session::merge::EffectiveConfig;

pub type HookError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Request,
    Response,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HookKind::Request => "request",
            HookKind::Response => "response",
        })
    }
}

impl FromStr for HookKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "request" => Ok(HookKind::Request),
            "response" => Ok(HookKind::Response),
            other => Err(format!("unknown hook kind '{other}'")),
        }
    }
}

/// What a request hook sees.
#[derive(Debug)]
pub struct RequestContext<'a> {
    pub request_id: Uuid,
    pub method: &'a Method,
    pub url: &'a str,
    /// Merged configuration, auth headers included.
    pub config: &'a EffectiveConfig,
}

#[derive(Debug)]
pub enum HookEvent<'a> {
    Request(RequestContext<'a>),
    Response(&'a Response),
}

impl HookEvent<'_> {
    pub fn kind(&self) -> HookKind {
        match self {
            HookEvent::Request(_) => HookKind::Request,
            HookEvent::Response(_) => HookKind::Response,
        }
    }
}

#[async_trait]
pub trait Hook: Send + Sync {
    async fn call(&self, event: &HookEvent<'_>) -> Result<(), HookError>;
}

/// Registered hooks, at most one per kind.
#[derive(Clone, Default)]
pub struct Hooks {
    hooks: HashMap<HookKind, Arc<dyn Hook>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook, replacing any previous one of the same kind.
    #[must_use]
    pub fn register(mut self, kind: HookKind, hook: impl Hook + 'static) -> Self {
        self.hooks.insert(kind, Arc::new(hook));
        self
    }

    pub fn get(&self, kind: HookKind) -> Option<&Arc<dyn Hook>> {
        self.hooks.get(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run the hook for this event, if any.
    pub(crate) async fn fire(&self, event: &HookEvent<'_>) -> Result<(), HookError> {
        match self.hooks.get(&event.kind()) {
            Some(hook) => hook.call(event).await,
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("kinds", &self.hooks.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Adapts a synchronous closure into a [`Hook`].
pub struct FnHook<F>(F);

impl<F> FnHook<F>
where
    F: Fn(&HookEvent<'_>) -> Result<(), HookError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> Hook for FnHook<F>
where
    F: Fn(&HookEvent<'_>) -> Result<(), HookError> + Send + Sync,
{
    async fn call(&self, event: &HookEvent<'_>) -> Result<(), HookError> {
        (self.0)(event)
    }
}
