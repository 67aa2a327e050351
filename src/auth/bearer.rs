//! Static bearer-token authenticator.

use std::collections::HashSet;

use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;

use super::{AuthError, RequestAuthenticator};
use crate::gatekeeper::GuardedRequest;

/// Admits requests carrying `Authorization: Bearer <token>` for one of the
/// configured tokens.
#[derive(Clone)]
pub struct BearerTokenAuthenticator {
    tokens: HashSet<String>,
}

impl BearerTokenAuthenticator {
    pub fn new(tokens: impl IntoIterator<Item = String>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }
}

// Tokens stay out of logs.
impl std::fmt::Debug for BearerTokenAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerTokenAuthenticator")
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

#[async_trait]
impl RequestAuthenticator for BearerTokenAuthenticator {
    async fn authenticate(&self, request: &GuardedRequest) -> Result<bool, AuthError> {
        let token = request
            .request
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "));

        Ok(token.is_some_and(|t| self.tokens.contains(t)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gatekeeper::GateRequest;
    use axum::http::HeaderValue;

    fn guarded(auth: Option<&'static str>) -> GuardedRequest {
        let mut request = GateRequest::new("GET", "/items");
        if let Some(value) = auth {
            request.headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        }
        GuardedRequest::for_test(request, "/items")
    }

    #[tokio::test]
    async fn test_bearer_tokens() {
        let auth = BearerTokenAuthenticator::new(["s3cret".to_string()]);
        assert!(auth.authenticate(&guarded(Some("Bearer s3cret"))).await.unwrap());
        assert!(!auth.authenticate(&guarded(Some("Bearer wrong"))).await.unwrap());
        assert!(!auth.authenticate(&guarded(Some("s3cret"))).await.unwrap());
        assert!(!auth.authenticate(&guarded(None)).await.unwrap());
    }

    #[test]
    fn test_debug_hides_tokens() {
        let auth = BearerTokenAuthenticator::new(["s3cret".to_string()]);
        assert!(!format!("{auth:?}").contains("s3cret"));
    }
}
