//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (permissions reference registered authenticators)
//! - Validate addresses and value ranges (timeouts > 0)
//! - Compile every condition and pattern so a bad table is caught at load
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function of the config and the registry
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::auth::AuthenticatorRegistry;
use crate::config::schema::GatekeeperConfig;
use crate::gatekeeper::{BuildError, Gatekeeper};

/// A single semantic problem in a configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field}: `{value}` is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("timeouts.request_secs must be greater than 0")]
    ZeroTimeout,

    #[error("observability.log_level: unknown level `{0}`")]
    UnknownLogLevel(String),

    #[error(transparent)]
    Permissions(#[from] BuildError),
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a parsed configuration against the authenticators in `registry`.
pub fn validate_config(
    config: &GatekeeperConfig,
    registry: &AuthenticatorRegistry,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if let Some(upstream) = &config.upstream {
        check_address(&mut errors, "upstream.address", &upstream.address);
    }
    if config.observability.metrics_enabled {
        check_address(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(config.observability.log_level.clone()));
    }

    if let Err(build) = Gatekeeper::from_config(config, registry) {
        errors.extend(build.0.into_iter().map(ValidationError::Permissions));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GatekeeperConfig::default(), &AuthenticatorRegistry::new()).is_ok());
    }

    #[test]
    fn test_reports_all_problems() {
        let config: GatekeeperConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "nowhere"

            [upstream]
            address = "localhost"

            [timeouts]
            request_secs = 0

            [observability]
            log_level = "loud"

            [permissions."/x".GET]
            query_param = { n = { "$within" = [1] } }
            "#,
        )
        .unwrap();

        let errors = validate_config(&config, &AuthenticatorRegistry::new()).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::ZeroTimeout));
        assert!(errors.contains(&ValidationError::UnknownLogLevel("loud".into())));
        assert!(matches!(errors.last(), Some(ValidationError::Permissions(_))));
        assert_eq!(
            errors[0].to_string(),
            "listener.bind_address: `nowhere` is not a socket address"
        );
    }

    #[test]
    fn test_bearer_reference_needs_tokens() {
        let text = r#"
            [permissions."/x".GET]
            request_authenticator = "bearer"
        "#;
        let config: GatekeeperConfig = toml::from_str(text).unwrap();
        assert!(validate_config(&config, &AuthenticatorRegistry::from_config(&config.auth)).is_err());

        let with_tokens = format!("[auth]\nbearer_tokens = [\"t\"]\n{text}");
        let config: GatekeeperConfig = toml::from_str(&with_tokens).unwrap();
        assert!(validate_config(&config, &AuthenticatorRegistry::from_config(&config.auth)).is_ok());
    }
}
