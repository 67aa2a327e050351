//! Host-agnostic request view and the metadata the gatekeeper attaches.

use std::collections::BTreeMap;

use axum::http::{request::Parts, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;

use super::permissions::{HeaderConditions, HttpMethod};
use crate::routing::PatternMatch;

/// Decoded query parameters. A key given several times holds an array.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct QueryParams(BTreeMap<String, Value>);

impl QueryParams {
    /// Parse a raw (still percent-encoded) query string.
    pub fn parse(query: Option<&str>) -> Self {
        let mut params: BTreeMap<String, Value> = BTreeMap::new();
        let Some(query) = query else {
            return Self(params);
        };

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = Value::String(value.into_owned());
            match params.get_mut(&*key) {
                None => {
                    params.insert(key.into_owned(), value);
                }
                Some(Value::Array(values)) => values.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
            }
        }
        Self(params)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What the gatekeeper needs from an incoming request.
#[derive(Debug, Clone)]
pub struct GateRequest {
    /// Method as received; matched case-insensitively.
    pub method: String,
    pub path: String,
    pub query: QueryParams,
    pub headers: HeaderMap,
}

impl GateRequest {
    /// Build from a method and a `path?query` target.
    pub fn new(method: impl Into<String>, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };
        Self {
            method: method.into(),
            path: path.to_string(),
            query: QueryParams::parse(query),
            headers: HeaderMap::new(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Snapshot the parts of an HTTP request.
    pub fn from_parts(parts: &Parts) -> Self {
        Self {
            method: parts.method.as_str().to_string(),
            path: parts.uri.path().to_string(),
            query: QueryParams::parse(parts.uri.query()),
            headers: parts.headers.clone(),
        }
    }

    /// Header value as a condition operand. Repeated headers are joined with
    /// `", "`; empty or non-text values count as absent.
    pub fn header_value(&self, name: &str) -> Option<Value> {
        let values = self
            .headers
            .get_all(name)
            .iter()
            .map(|v| v.to_str().ok())
            .collect::<Option<Vec<_>>>()?;
        let joined = values.join(", ");
        (!joined.is_empty()).then_some(Value::String(joined))
    }
}

/// Metadata attached to an admitted request. Downstream handlers read it
/// from the request extensions.
#[derive(Debug, Clone, Serialize)]
pub struct GateContext {
    pub method: HttpMethod,
    pub pattern_match: PatternMatch,
    /// Effective header conditions after merging defaults.
    pub headers: HeaderConditions,
    pub query_params: QueryParams,
}

/// A request that passed every structural check, as seen by authenticators.
#[derive(Debug, Clone)]
pub struct GuardedRequest {
    pub request: GateRequest,
    pub context: GateContext,
}

#[cfg(test)]
impl GuardedRequest {
    pub(crate) fn for_test(request: GateRequest, pattern: &str) -> Self {
        let context = GateContext {
            method: request.method.parse().unwrap_or(HttpMethod::Get),
            pattern_match: PatternMatch {
                pattern: pattern.to_string(),
                params: BTreeMap::new(),
                wildcard: None,
            },
            headers: HeaderConditions::new(),
            query_params: request.query.clone(),
        };
        Self { request, context }
    }
}
