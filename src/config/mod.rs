//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (addresses, timeouts, compiled permission table)
//!     → GatekeeperConfig (validated, immutable)
//!     → Gatekeeper::from_config
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → config sent to the server, which swaps in a new Gatekeeper
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_config_with, registry_for, ConfigError};
pub use schema::{
    AuthConfig, GatekeeperConfig, ListenerConfig, ObservabilityConfig, PipelineConfig, RawMethodPermission,
    TimeoutConfig, UpstreamConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
