//! Request authenticators.
//!
//! # Data Flow
//! ```text
//! Gatekeeper (all structural checks passed)
//!     → GuardedRequest (request + gate context)
//!     → pipeline-wide authenticator (optional)
//!     → method-specific authenticator (optional)
//!     → allow / deny
//! ```
//!
//! # Design Decisions
//! - Authenticators are async; they may do I/O (database, token service)
//! - A failing authenticator counts as a denial
//! - Authenticators are referenced by name from configuration through an
//!   [`AuthenticatorRegistry`]; code registers them before building

pub mod bearer;

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AuthConfig;
use crate::gatekeeper::GuardedRequest;

pub use bearer::BearerTokenAuthenticator;

/// Error type authenticators may return. The reason is logged, never sent
/// to the client.
pub type AuthError = Box<dyn std::error::Error + Send + Sync>;

/// Name under which [`BearerTokenAuthenticator`] is registered.
pub const BEARER: &str = "bearer";

/// A final yes/no decision over a request that passed every structural check.
#[async_trait]
pub trait RequestAuthenticator: Send + Sync + fmt::Debug {
    /// Returns `Ok(true)` to admit the request.
    async fn authenticate(&self, request: &GuardedRequest) -> Result<bool, AuthError>;
}

/// Adapter turning an async closure into an authenticator.
pub struct FnAuthenticator<F> {
    f: F,
}

impl<F> fmt::Debug for FnAuthenticator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAuthenticator").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> RequestAuthenticator for FnAuthenticator<F>
where
    F: Fn(GuardedRequest) -> Fut + Send + Sync,
    Fut: Future<Output = bool> + Send + 'static,
{
    async fn authenticate(&self, request: &GuardedRequest) -> Result<bool, AuthError> {
        Ok((self.f)(request.clone()).await)
    }
}

/// Wrap an async closure as a shareable authenticator.
///
/// ```ignore
/// let only_admins = authenticator_fn(|req| async move {
///     req.request.headers.get("x-role").is_some_and(|v| v == "admin")
/// });
/// ```
pub fn authenticator_fn<F, Fut>(f: F) -> Arc<dyn RequestAuthenticator>
where
    F: Fn(GuardedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    Arc::new(FnAuthenticator { f })
}

/// Named authenticators that configuration files can refer to.
#[derive(Debug, Clone, Default)]
pub struct AuthenticatorRegistry {
    entries: BTreeMap<String, Arc<dyn RequestAuthenticator>>,
}

impl AuthenticatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in authenticators enabled by `config`.
    pub fn from_config(config: &AuthConfig) -> Self {
        let mut registry = Self::new();
        if !config.bearer_tokens.is_empty() {
            registry.register(
                BEARER,
                Arc::new(BearerTokenAuthenticator::new(config.bearer_tokens.iter().cloned())),
            );
        }
        registry
    }

    /// Register (or replace) an authenticator under `name`.
    pub fn register(&mut self, name: impl Into<String>, authenticator: Arc<dyn RequestAuthenticator>) -> &mut Self {
        self.entries.insert(name.into(), authenticator);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn RequestAuthenticator>> {
        self.entries.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gatekeeper::GateRequest;

    #[tokio::test]
    async fn test_fn_authenticator_sees_request() {
        let auth = authenticator_fn(|req| async move { req.context.pattern_match.pattern == "/items" });
        let guarded = GuardedRequest::for_test(GateRequest::new("GET", "/items"), "/items");
        assert!(auth.authenticate(&guarded).await.unwrap());

        let other = GuardedRequest::for_test(GateRequest::new("GET", "/other"), "/other");
        assert!(!auth.authenticate(&other).await.unwrap());
    }

    #[test]
    fn test_registry_from_config() {
        let empty = AuthenticatorRegistry::from_config(&AuthConfig::default());
        assert!(empty.get(BEARER).is_none());

        let config = AuthConfig {
            bearer_tokens: vec!["secret".into()],
            require: None,
        };
        let registry = AuthenticatorRegistry::from_config(&config);
        assert!(registry.get(BEARER).is_some());
        assert_eq!(registry.names().collect::<Vec<_>>(), vec![BEARER]);
    }
}
