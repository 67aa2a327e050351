//! Permission table types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::RequestAuthenticator;
use crate::condition::Condition;

/// Header name (lower-case) → condition.
pub type HeaderConditions = BTreeMap<String, Condition>;

/// Query parameter name → condition.
pub type QueryConditions = BTreeMap<String, Condition>;

/// The HTTP methods a permission table can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Head,
    Get,
    Put,
    Post,
    Delete,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::Head,
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Post,
        HttpMethod::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Head => "HEAD",
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported method `{0}`")]
pub struct UnsupportedMethod(pub String);

/// Case-insensitive.
impl FromStr for HttpMethod {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == upper)
            .ok_or_else(|| UnsupportedMethod(s.to_string()))
    }
}

/// Everything that gates one method on one pattern.
#[derive(Debug, Clone, Default)]
pub struct MethodPermission {
    /// Accepted query parameters. Empty means no query parameters at all.
    pub query_param: QueryConditions,
    /// Headers the request must carry, merged over the pipeline defaults.
    pub minimum_expected_headers: HeaderConditions,
    pub request_authenticator: Option<Arc<dyn RequestAuthenticator>>,
}

impl MethodPermission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, name: impl Into<String>, condition: Condition) -> Self {
        self.query_param.insert(name.into(), condition);
        self
    }

    /// Header names are matched lower-case.
    pub fn header(mut self, name: impl AsRef<str>, condition: Condition) -> Self {
        self.minimum_expected_headers
            .insert(name.as_ref().to_ascii_lowercase(), condition);
        self
    }

    pub fn authenticator(mut self, authenticator: Arc<dyn RequestAuthenticator>) -> Self {
        self.request_authenticator = Some(authenticator);
        self
    }
}

/// Method → permission for one pattern. A missing method is not allowed.
pub type MethodTable = BTreeMap<HttpMethod, MethodPermission>;

/// URL pattern → method table.
#[derive(Debug, Clone, Default)]
pub struct PermissionTable {
    routes: BTreeMap<String, MethodTable>,
}

impl PermissionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`PermissionTable::insert`].
    pub fn allow(mut self, pattern: impl Into<String>, method: HttpMethod, permission: MethodPermission) -> Self {
        self.insert(pattern, method, permission);
        self
    }

    /// Register `pattern` without granting anything. Methods not inserted
    /// afterwards are answered with 405.
    pub fn define(&mut self, pattern: impl Into<String>) -> &mut MethodTable {
        self.routes.entry(pattern.into()).or_default()
    }

    /// Grant `method` on `pattern`, replacing any previous permission.
    pub fn insert(&mut self, pattern: impl Into<String>, method: HttpMethod, permission: MethodPermission) {
        self.define(pattern).insert(method, permission);
    }

    pub fn get(&self, pattern: &str) -> Option<&MethodTable> {
        self.routes.get(pattern)
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut MethodTable)> {
        self.routes.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing_is_case_insensitive() {
        assert_eq!("get".parse::<HttpMethod>(), Ok(HttpMethod::Get));
        assert_eq!("Delete".parse::<HttpMethod>(), Ok(HttpMethod::Delete));
        assert_eq!(
            "PATCH".parse::<HttpMethod>(),
            Err(UnsupportedMethod("PATCH".into()))
        );
    }

    #[test]
    fn test_table_builder() {
        let table = PermissionTable::new()
            .allow("/items", HttpMethod::Get, MethodPermission::new())
            .allow("/items", HttpMethod::Post, MethodPermission::new())
            .allow("/users", HttpMethod::Get, MethodPermission::new());

        assert_eq!(table.len(), 2);
        let items = table.get("/items").unwrap();
        assert!(items.contains_key(&HttpMethod::Get));
        assert!(items.contains_key(&HttpMethod::Post));
        assert!(!items.contains_key(&HttpMethod::Delete));
        assert_eq!(table.patterns().collect::<Vec<_>>(), vec!["/items", "/users"]);
    }

    #[test]
    fn test_define_keeps_existing_methods() {
        let mut table = PermissionTable::new().allow("/items", HttpMethod::Get, MethodPermission::new());
        table.define("/items");
        table.define("/empty");

        assert_eq!(table.len(), 2);
        assert!(table.get("/items").unwrap().contains_key(&HttpMethod::Get));
        assert!(table.get("/empty").unwrap().is_empty());
    }
}
