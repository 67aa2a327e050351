//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::auth::AuthenticatorRegistry;
use crate::config::schema::GatekeeperConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file, resolving authenticator
/// names against the built-ins enabled by the file's `[auth]` section.
pub fn load_config(path: &Path) -> Result<GatekeeperConfig, ConfigError> {
    load_config_with(path, &AuthenticatorRegistry::new())
}

/// Like [`load_config`], with extra application-provided authenticators.
/// Built-ins from `[auth]` are added on top of `extra`.
pub fn load_config_with(
    path: &Path,
    extra: &AuthenticatorRegistry,
) -> Result<GatekeeperConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GatekeeperConfig = toml::from_str(&content)?;

    let registry = registry_for(&config, extra);
    validate_config(&config, &registry).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// `extra` plus the built-in authenticators `config` enables.
pub fn registry_for(config: &GatekeeperConfig, extra: &AuthenticatorRegistry) -> AuthenticatorRegistry {
    let mut registry = extra.clone();
    let builtins = AuthenticatorRegistry::from_config(&config.auth);
    for name in builtins.names() {
        if let Some(authenticator) = builtins.get(name) {
            registry.register(name, authenticator);
        }
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_file() {
        let file = write_config(
            r#"
            [auth]
            bearer_tokens = ["abc"]

            [permissions."/items".GET]
            request_authenticator = "bearer"
            "#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.permissions.len(), 1);
    }

    #[test]
    fn test_error_kinds() {
        assert!(matches!(
            load_config(Path::new("/definitely/not/here.toml")),
            Err(ConfigError::Io(_))
        ));

        let broken = write_config("[permissions\n");
        assert!(matches!(load_config(broken.path()), Err(ConfigError::Parse(_))));

        let invalid = write_config("[timeouts]\nrequest_secs = 0\n");
        let err = load_config(invalid.path()).unwrap_err();
        assert!(err.to_string().starts_with("Validation failed: "));
    }

    #[test]
    fn test_extra_authenticators_are_visible() {
        let file = write_config(
            r#"
            [permissions."/items".GET]
            request_authenticator = "sso"
            "#,
        );
        assert!(load_config(file.path()).is_err());

        let mut extra = AuthenticatorRegistry::new();
        extra.register("sso", crate::auth::authenticator_fn(|_| async { true }));
        assert!(load_config_with(file.path(), &extra).is_ok());
    }
}
