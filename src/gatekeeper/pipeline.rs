//! The per-request decision pipeline.
//!
//! # Responsibilities
//! - Compile a permission table into a [`Compass`] at construction
//! - Run the ordered checks for each request, stopping at the first failure
//! - Invoke authenticators with the enriched request
//!
//! # Design Decisions
//! - Construction problems never half-configure: the gatekeeper either has
//!   a complete compiled table or rejects everything with a 500
//! - The compiled state sits behind an `Arc` and is never mutated, so
//!   concurrent requests share it without locking
//! - Authentication failures are logged server-side only

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::http::HeaderName;
use futures_util::FutureExt;
use tracing::{debug, error, warn};

use super::error::{BuildError, BuildErrors};
use super::headers::combine_headers;
use super::permissions::{HeaderConditions, HttpMethod, MethodPermission, PermissionTable, QueryConditions};
use super::rejection::Rejection;
use super::request::{GateContext, GateRequest, GuardedRequest, QueryParams};
use crate::auth::RequestAuthenticator;
use crate::condition::evaluate;
use crate::routing::{Compass, PatternMatch};

/// Pipeline-wide settings applied to every pattern.
#[derive(Debug, Clone, Default)]
pub struct GatekeeperOptions {
    /// Runs before any method-specific authenticator.
    pub authenticator: Option<Arc<dyn RequestAuthenticator>>,
    /// Merged under each method's `minimum_expected_headers`.
    pub minimum_expected_headers: HeaderConditions,
}

#[derive(Debug)]
struct Compiled {
    compass: Compass,
    permissions: PermissionTable,
    options: GatekeeperOptions,
}

#[derive(Debug)]
enum State {
    Ready(Compiled),
    Misconfigured,
}

/// The request gatekeeper. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Gatekeeper {
    state: Arc<State>,
}

impl Gatekeeper {
    /// Build a gatekeeper, reporting every construction problem.
    pub fn try_new(mut permissions: PermissionTable, mut options: GatekeeperOptions) -> Result<Self, BuildErrors> {
        let mut errors = Vec::new();
        let mut compass = Compass::new();

        for pattern in permissions.patterns() {
            if let Err(e) = compass.define(pattern) {
                errors.push(BuildError::from(e));
            }
        }

        options.minimum_expected_headers =
            normalize_headers(std::mem::take(&mut options.minimum_expected_headers), "pipeline", &mut errors);
        for (pattern, methods) in permissions.iter_mut() {
            for (method, permission) in methods.iter_mut() {
                let location = format!("{pattern} {method}");
                permission.minimum_expected_headers = normalize_headers(
                    std::mem::take(&mut permission.minimum_expected_headers),
                    &location,
                    &mut errors,
                );
            }
        }

        if !errors.is_empty() {
            return Err(BuildErrors(errors));
        }

        Ok(Self {
            state: Arc::new(State::Ready(Compiled {
                compass,
                permissions,
                options,
            })),
        })
    }

    /// Build a gatekeeper. On a construction problem the error is logged once
    /// and the returned gatekeeper rejects every request with a 500.
    pub fn new(permissions: PermissionTable, options: GatekeeperOptions) -> Self {
        match Self::try_new(permissions, options) {
            Ok(gatekeeper) => {
                gatekeeper.log_configured();
                gatekeeper
            }
            Err(e) => {
                error!(error = %e, "Gatekeeper failed to configure; rejecting all requests");
                Self::misconfigured()
            }
        }
    }

    /// A gatekeeper that rejects every request with a 500.
    pub fn misconfigured() -> Self {
        Self {
            state: Arc::new(State::Misconfigured),
        }
    }

    pub fn is_misconfigured(&self) -> bool {
        matches!(*self.state, State::Misconfigured)
    }

    /// Log the shape of a gatekeeper that is about to serve requests.
    pub fn log_configured(&self) {
        if let State::Ready(compiled) = self.state.as_ref() {
            tracing::info!(
                patterns = compiled.compass.len(),
                pipeline_authenticator = compiled.options.authenticator.is_some(),
                default_headers = compiled.options.minimum_expected_headers.len(),
                "Gatekeeper configured"
            );
        }
    }

    /// Run the full pipeline over one request.
    pub async fn check(&self, request: GateRequest) -> Result<GuardedRequest, Rejection> {
        let compiled = match self.state.as_ref() {
            State::Ready(compiled) => compiled,
            State::Misconfigured => return Err(Rejection::misconfigured()),
        };

        // 1. Resolve pattern
        let Some(pattern_match) = compiled.compass.find(&request.path) else {
            debug!(path = %request.path, "No pattern matched");
            return Err(Rejection::not_found());
        };

        let pattern = pattern_match.pattern.clone();
        admit(compiled, request, pattern_match)
            .await
            .map_err(|rejection| rejection.at(pattern))
    }
}

/// Steps after the pattern is known.
async fn admit(
    compiled: &Compiled,
    request: GateRequest,
    pattern_match: PatternMatch,
) -> Result<GuardedRequest, Rejection> {
    // 2. Method lookup
    let method: Option<HttpMethod> = request.method.parse().ok();
    let permission = method.zip(compiled.permissions.get(&pattern_match.pattern)).and_then(
        |(method, methods)| methods.get(&method).map(|permission| (method, permission)),
    );
    let Some((method, permission)) = permission else {
        debug!(pattern = %pattern_match.pattern, method = %request.method, "Method not allowed");
        return Err(Rejection::method_not_allowed());
    };

    // 3-4. Query arity and conditions
    check_query(&permission.query_param, &request.query)?;

    // 5-6. Header merge and conditions
    let headers = combine_headers(
        &compiled.options.minimum_expected_headers,
        &permission.minimum_expected_headers,
    );
    check_headers(&headers, &request)?;

    // 7. Enrich
    let guarded = GuardedRequest {
        context: GateContext {
            method,
            pattern_match,
            headers,
            query_params: request.query.clone(),
        },
        request,
    };

    // 8. Authenticate
    authenticate(&compiled.options, permission, &guarded).await?;

    Ok(guarded)
}

fn normalize_headers(
    headers: HeaderConditions,
    location: &str,
    errors: &mut Vec<BuildError>,
) -> HeaderConditions {
    let mut normalized = HeaderConditions::new();
    for (name, condition) in headers {
        let lower = name.to_ascii_lowercase();
        if HeaderName::from_bytes(lower.as_bytes()).is_err() {
            errors.push(BuildError::HeaderName {
                location: location.to_string(),
                name,
            });
        } else if normalized.contains_key(&lower) {
            errors.push(BuildError::DuplicateHeader {
                location: location.to_string(),
                name: lower,
            });
        } else {
            normalized.insert(lower, condition);
        }
    }
    normalized
}

fn expected_names(conditions: &QueryConditions) -> String {
    conditions.keys().map(String::as_str).collect::<Vec<_>>().join(",")
}

fn check_query(conditions: &QueryConditions, query: &QueryParams) -> Result<(), Rejection> {
    if conditions.len() != query.len() {
        return Err(Rejection::bad_request(format!(
            "This url expects {} query parameters [{}] and request has {}",
            conditions.len(),
            expected_names(conditions),
            query.len()
        )));
    }

    for (name, value) in query.iter() {
        let Some(condition) = conditions.get(name) else {
            return Err(Rejection::bad_request(format!(
                "This url expects query parameters [{}]",
                expected_names(conditions)
            )));
        };
        if !evaluate(Some(value), condition) {
            return Err(Rejection::bad_request(format!(
                "Query param {name} value should be {condition}"
            )));
        }
    }
    Ok(())
}

fn check_headers(conditions: &HeaderConditions, request: &GateRequest) -> Result<(), Rejection> {
    for (name, condition) in conditions {
        let Some(value) = request.header_value(name) else {
            let required = conditions.keys().map(String::as_str).collect::<Vec<_>>().join(",");
            return Err(Rejection::bad_request(format!(
                "Not all request headers supplied: [{required}]"
            )));
        };
        if !evaluate(Some(&value), condition) {
            return Err(Rejection::bad_request(format!(
                "Header {name} value should be {condition}"
            )));
        }
    }
    Ok(())
}

async fn authenticate(
    options: &GatekeeperOptions,
    permission: &MethodPermission,
    request: &GuardedRequest,
) -> Result<(), Rejection> {
    let chain = [
        ("pipeline", options.authenticator.as_ref()),
        ("method", permission.request_authenticator.as_ref()),
    ];

    for (scope, authenticator) in chain {
        let Some(authenticator) = authenticator else {
            continue;
        };
        if !run_authenticator(authenticator.as_ref(), request, scope).await {
            return Err(Rejection::unauthorized());
        }
    }
    Ok(())
}

async fn run_authenticator(
    authenticator: &dyn RequestAuthenticator,
    request: &GuardedRequest,
    scope: &'static str,
) -> bool {
    let pattern = &request.context.pattern_match.pattern;
    match AssertUnwindSafe(authenticator.authenticate(request))
        .catch_unwind()
        .await
    {
        Ok(Ok(true)) => true,
        Ok(Ok(false)) => {
            debug!(%pattern, scope, "Authenticator denied request");
            false
        }
        Ok(Err(e)) => {
            warn!(%pattern, scope, error = %e, "Authenticator failed");
            false
        }
        Err(_) => {
            error!(%pattern, scope, "Authenticator panicked");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::authenticator_fn;
    use crate::condition::{Condition, RawCondition};
    use crate::gatekeeper::RejectionKind;
    use axum::http::{HeaderName, HeaderValue};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cond(op: &str, operand: Value) -> Condition {
        Condition::compile(&RawCondition::new(op, operand)).unwrap()
    }

    fn items_gatekeeper() -> Gatekeeper {
        let table = PermissionTable::new().allow(
            "/items",
            HttpMethod::Get,
            MethodPermission::new().query("limit", cond("$within", json!([1, 10]))),
        );
        Gatekeeper::try_new(table, GatekeeperOptions::default()).unwrap()
    }

    async fn kind_of(gatekeeper: &Gatekeeper, request: GateRequest) -> Option<RejectionKind> {
        gatekeeper.check(request).await.err().map(|r| r.kind)
    }

    #[tokio::test]
    async fn test_items_scenario() {
        let gk = items_gatekeeper();

        let admitted = gk.check(GateRequest::new("GET", "/items?limit=5")).await.unwrap();
        assert_eq!(admitted.context.method, HttpMethod::Get);
        assert_eq!(admitted.context.pattern_match.pattern, "/items");
        assert_eq!(admitted.context.query_params.get("limit"), Some(&json!("5")));

        let too_big = gk.check(GateRequest::new("GET", "/items?limit=20")).await.unwrap_err();
        assert_eq!(too_big.kind, RejectionKind::BadRequest);
        assert_eq!(too_big.message, r#"Query param limit value should be {"$within":[1,10]}"#);
        assert_eq!(too_big.pattern.as_deref(), Some("/items"));

        let missing = gk.check(GateRequest::new("GET", "/items")).await.unwrap_err();
        assert_eq!(missing.kind, RejectionKind::BadRequest);
        assert_eq!(
            missing.message,
            "This url expects 1 query parameters [limit] and request has 0"
        );

        assert_eq!(
            kind_of(&gk, GateRequest::new("POST", "/items")).await,
            Some(RejectionKind::MethodNotAllowed)
        );
        let unknown = gk.check(GateRequest::new("GET", "/other")).await.unwrap_err();
        assert_eq!(unknown.kind, RejectionKind::NotFound);
        assert_eq!(unknown.message, "No such path configured");
        assert_eq!(unknown.pattern, None);
    }

    #[tokio::test]
    async fn test_method_is_case_insensitive_and_unknown_verbs_rejected() {
        let gk = items_gatekeeper();
        assert!(gk.check(GateRequest::new("get", "/items?limit=1")).await.is_ok());
        assert_eq!(
            kind_of(&gk, GateRequest::new("PATCH", "/items?limit=1")).await,
            Some(RejectionKind::MethodNotAllowed)
        );
    }

    #[tokio::test]
    async fn test_query_arity_is_exact() {
        let table = PermissionTable::new().allow(
            "/search",
            HttpMethod::Get,
            MethodPermission::new()
                .query("q", cond("$exists", json!(true)))
                .query("page", cond("$gte", json!(1))),
        );
        let gk = Gatekeeper::try_new(table, GatekeeperOptions::default()).unwrap();

        assert!(gk.check(GateRequest::new("GET", "/search?q=x&page=2")).await.is_ok());
        for target in ["/search?q=x", "/search?q=x&page=2&extra=1", "/search?q=x&page=0&sort=a"] {
            assert_eq!(
                kind_of(&gk, GateRequest::new("GET", target)).await,
                Some(RejectionKind::BadRequest),
                "{target}"
            );
        }

        let unknown = gk.check(GateRequest::new("GET", "/search?q=x&pg=2")).await.unwrap_err();
        assert_eq!(unknown.message, "This url expects query parameters [page,q]");
    }

    #[tokio::test]
    async fn test_no_query_params_configured_rejects_any() {
        let table = PermissionTable::new().allow("/ping", HttpMethod::Get, MethodPermission::new());
        let gk = Gatekeeper::try_new(table, GatekeeperOptions::default()).unwrap();
        assert!(gk.check(GateRequest::new("GET", "/ping")).await.is_ok());
        assert_eq!(
            kind_of(&gk, GateRequest::new("GET", "/ping?x=1")).await,
            Some(RejectionKind::BadRequest)
        );
    }

    #[tokio::test]
    async fn test_header_checks() {
        let table = PermissionTable::new().allow(
            "/secure",
            HttpMethod::Get,
            MethodPermission::new()
                .header("Authorization", cond("$regex", json!("^Bearer ")))
                .header("x-api-version", cond("$eq", json!("2"))),
        );
        let options = GatekeeperOptions {
            minimum_expected_headers: HeaderConditions::from([
                ("x-api-version".to_string(), cond("$eq", json!("1"))),
                ("x-client".to_string(), cond("$in", json!(["web", "ios"]))),
            ]),
            ..Default::default()
        };
        let gk = Gatekeeper::try_new(table, options).unwrap();

        let base = || {
            GateRequest::new("GET", "/secure")
                .with_header(HeaderName::from_static("x-client"), HeaderValue::from_static("web"))
                .with_header(HeaderName::from_static("x-api-version"), HeaderValue::from_static("2"))
        };

        let ok = gk
            .check(base().with_header(
                HeaderName::from_static("authorization"),
                HeaderValue::from_static("Bearer abc"),
            ))
            .await
            .unwrap();
        assert_eq!(
            ok.context.headers.keys().collect::<Vec<_>>(),
            vec!["authorization", "x-api-version", "x-client"]
        );

        let missing = gk.check(base()).await.unwrap_err();
        assert_eq!(
            missing.message,
            "Not all request headers supplied: [authorization,x-api-version,x-client]"
        );

        let wrong = gk
            .check(base().with_header(
                HeaderName::from_static("authorization"),
                HeaderValue::from_static("Basic abc"),
            ))
            .await
            .unwrap_err();
        assert_eq!(wrong.message, r#"Header authorization value should be {"$regex": /^Bearer /}"#);
    }

    #[tokio::test]
    async fn test_method_authenticator_denies() {
        let table = PermissionTable::new().allow(
            "/items",
            HttpMethod::Get,
            MethodPermission::new().authenticator(authenticator_fn(|_| async { false })),
        );
        let gk = Gatekeeper::try_new(table, GatekeeperOptions::default()).unwrap();
        let rejection = gk.check(GateRequest::new("GET", "/items")).await.unwrap_err();
        assert_eq!(rejection.kind, RejectionKind::Unauthorized);
        assert_eq!(rejection.message, "Authentication failed");
    }

    #[tokio::test]
    async fn test_authenticators_are_independent_and_ordered() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let pipeline = authenticator_fn(move |_| {
            let counted = counted.clone();
            async move {
                counted.fetch_add(1, Ordering::SeqCst);
                false
            }
        });
        let method_calls = Arc::new(AtomicUsize::new(0));
        let method_counted = method_calls.clone();
        let method = authenticator_fn(move |_| {
            let method_counted = method_counted.clone();
            async move {
                method_counted.fetch_add(1, Ordering::SeqCst);
                true
            }
        });

        let table = PermissionTable::new().allow(
            "/items",
            HttpMethod::Get,
            MethodPermission::new().authenticator(method),
        );
        let options = GatekeeperOptions {
            authenticator: Some(pipeline),
            ..Default::default()
        };
        let gk = Gatekeeper::try_new(table, options).unwrap();

        assert_eq!(
            kind_of(&gk, GateRequest::new("GET", "/items")).await,
            Some(RejectionKind::Unauthorized)
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(method_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_authenticator_not_called_when_structure_fails() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let auth = authenticator_fn(move |_| {
            let counted = counted.clone();
            async move {
                counted.fetch_add(1, Ordering::SeqCst);
                true
            }
        });
        let table = PermissionTable::new().allow("/items", HttpMethod::Get, MethodPermission::new().authenticator(auth));
        let gk = Gatekeeper::try_new(table, GatekeeperOptions::default()).unwrap();

        assert!(gk.check(GateRequest::new("GET", "/items?x=1")).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(gk.check(GateRequest::new("GET", "/items")).await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[derive(Debug)]
    struct Exploding;

    #[async_trait::async_trait]
    impl RequestAuthenticator for Exploding {
        async fn authenticate(&self, _request: &GuardedRequest) -> Result<bool, crate::auth::AuthError> {
            Err("token service unreachable".into())
        }
    }

    #[derive(Debug)]
    struct Panicking;

    #[async_trait::async_trait]
    impl RequestAuthenticator for Panicking {
        async fn authenticate(&self, _request: &GuardedRequest) -> Result<bool, crate::auth::AuthError> {
            panic!("authenticator bug")
        }
    }

    #[tokio::test]
    async fn test_failing_authenticators_reject_without_leaking() {
        let failing: [Arc<dyn RequestAuthenticator>; 2] = [Arc::new(Exploding), Arc::new(Panicking)];
        for auth in failing {
            let table = PermissionTable::new().allow("/x", HttpMethod::Get, MethodPermission::new().authenticator(auth));
            let gk = Gatekeeper::try_new(table, GatekeeperOptions::default()).unwrap();
            let rejection = gk.check(GateRequest::new("GET", "/x")).await.unwrap_err();
            assert_eq!(rejection.kind, RejectionKind::Unauthorized);
            assert_eq!(rejection.message, "Authentication failed");
        }
    }

    #[tokio::test]
    async fn test_construction_failure_rejects_everything() {
        let table = PermissionTable::new()
            .allow("/u/:id", HttpMethod::Get, MethodPermission::new())
            .allow("/u/:name/x", HttpMethod::Get, MethodPermission::new());
        let errors = Gatekeeper::try_new(table.clone(), GatekeeperOptions::default()).unwrap_err();
        assert_eq!(errors.len(), 1);

        let gk = Gatekeeper::new(table, GatekeeperOptions::default());
        assert!(gk.is_misconfigured());
        for target in ["/u/1", "/anything", "/"] {
            let rejection = gk.check(GateRequest::new("GET", target)).await.unwrap_err();
            assert_eq!(rejection.kind, RejectionKind::InternalConfigurationError);
            assert_eq!(rejection.message, "Gatekeeper failed to configure");
        }
    }

    #[test]
    fn test_invalid_header_names_are_collected() {
        let table = PermissionTable::new()
            .allow("/a", HttpMethod::Get, MethodPermission::new().header("bad header", cond("$exists", json!(true))))
            .allow("a", HttpMethod::Get, MethodPermission::new());
        let errors = Gatekeeper::try_new(table, GatekeeperOptions::default()).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_case_colliding_header_names_are_collected() {
        let mut permission = MethodPermission::new();
        permission
            .minimum_expected_headers
            .insert("X-Key".into(), cond("$exists", json!(true)));
        permission
            .minimum_expected_headers
            .insert("x-key".into(), cond("$eq", json!("1")));
        let table = PermissionTable::new().allow("/a", HttpMethod::Get, permission);

        let errors = Gatekeeper::try_new(table, GatekeeperOptions::default()).unwrap_err();
        assert_eq!(
            errors.0,
            vec![BuildError::DuplicateHeader {
                location: "/a GET".into(),
                name: "x-key".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_path_params_reach_context() {
        let table = PermissionTable::new().allow("/users/:id", HttpMethod::Delete, MethodPermission::new());
        let gk = Gatekeeper::try_new(table, GatekeeperOptions::default()).unwrap();
        let guarded = gk.check(GateRequest::new("DELETE", "/users/42")).await.unwrap();
        assert_eq!(guarded.context.pattern_match.params.get("id").map(String::as_str), Some("42"));
    }
}
