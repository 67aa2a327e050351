//! Building a gatekeeper from file configuration.
//!
//! # Data Flow
//! ```text
//! GatekeeperConfig (raw strings, raw conditions, authenticator names)
//!     → compile conditions, parse methods, resolve names via registry
//!     → PermissionTable + GatekeeperOptions
//!     → Gatekeeper::try_new (patterns, header names)
//! ```
//!
//! Every problem across both stages is collected so a single run of
//! `check` reports all of them.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::error::{BuildError, BuildErrors};
use super::permissions::{HttpMethod, MethodPermission, PermissionTable};
use super::pipeline::{Gatekeeper, GatekeeperOptions};
use crate::auth::{AuthenticatorRegistry, RequestAuthenticator};
use crate::condition::{Condition, RawCondition};
use crate::config::{GatekeeperConfig, RawMethodPermission};

impl Gatekeeper {
    /// Build from configuration, resolving authenticator names in `registry`.
    pub fn from_config(
        config: &GatekeeperConfig,
        registry: &AuthenticatorRegistry,
    ) -> Result<Self, BuildErrors> {
        let mut errors = Vec::new();
        let (table, options) = compile(config, registry, &mut errors);

        match Gatekeeper::try_new(table, options) {
            Ok(gatekeeper) if errors.is_empty() => Ok(gatekeeper),
            Ok(_) => Err(BuildErrors(errors)),
            Err(BuildErrors(more)) => {
                errors.extend(more);
                Err(BuildErrors(errors))
            }
        }
    }
}

fn compile(
    config: &GatekeeperConfig,
    registry: &AuthenticatorRegistry,
    errors: &mut Vec<BuildError>,
) -> (PermissionTable, GatekeeperOptions) {
    let mut table = PermissionTable::new();

    for (pattern, methods) in &config.permissions {
        table.define(pattern.clone());
        for (method_name, raw) in methods {
            let location = format!("{pattern} {method_name}");
            let method = match method_name.parse::<HttpMethod>() {
                Ok(method) => method,
                Err(_) => {
                    errors.push(BuildError::Method {
                        location: pattern.clone(),
                        method: method_name.clone(),
                    });
                    continue;
                }
            };
            let permission = compile_permission(raw, &location, registry, errors);
            table.insert(pattern.clone(), method, permission);
        }
    }

    let options = GatekeeperOptions {
        authenticator: config
            .auth
            .require
            .as_deref()
            .and_then(|name| resolve(registry, name, "auth.require", errors)),
        minimum_expected_headers: compile_conditions(
            &config.pipeline.minimum_expected_headers,
            "pipeline minimum_expected_headers",
            errors,
        ),
    };

    (table, options)
}

fn compile_permission(
    raw: &RawMethodPermission,
    location: &str,
    registry: &AuthenticatorRegistry,
    errors: &mut Vec<BuildError>,
) -> MethodPermission {
    MethodPermission {
        query_param: compile_conditions(&raw.query_param, &format!("{location} query_param"), errors),
        minimum_expected_headers: compile_conditions(
            &raw.minimum_expected_headers,
            &format!("{location} minimum_expected_headers"),
            errors,
        ),
        request_authenticator: raw
            .request_authenticator
            .as_deref()
            .and_then(|name| resolve(registry, name, location, errors)),
    }
}

fn compile_conditions(
    raw: &BTreeMap<String, RawCondition>,
    location: &str,
    errors: &mut Vec<BuildError>,
) -> BTreeMap<String, Condition> {
    raw.iter()
        .filter_map(|(key, raw)| match Condition::compile(raw) {
            Ok(condition) => Some((key.clone(), condition)),
            Err(source) => {
                errors.push(BuildError::Condition {
                    location: location.to_string(),
                    key: key.clone(),
                    source,
                });
                None
            }
        })
        .collect()
}

fn resolve(
    registry: &AuthenticatorRegistry,
    name: &str,
    location: &str,
    errors: &mut Vec<BuildError>,
) -> Option<Arc<dyn RequestAuthenticator>> {
    let found = registry.get(name);
    if found.is_none() {
        errors.push(BuildError::UnknownAuthenticator {
            location: location.to_string(),
            name: name.to_string(),
        });
    }
    found
}
