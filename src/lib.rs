//! Request Gatekeeper
//!
//! A policy-driven admission layer for HTTP services. A declarative
//! permission table (URL pattern → method → query/header conditions and an
//! optional authenticator) is compiled once into a segment-indexed path
//! matcher; every request then runs a fixed, ordered accept/reject pipeline.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────▶ http (request id, trace, timeout)
//!                        │
//!                        ▼
//!                    gatekeeper ──▶ routing::Compass   (pattern)
//!                        │     ──▶ condition::evaluate (query, headers)
//!                        │     ──▶ auth                (authenticators)
//!                        ▼
//!                    upstream / echo
//!
//!     Cross-cutting: config (TOML, hot reload), observability, lifecycle
//! ```
//!
//! # Embedding
//!
//! ```ignore
//! let table = PermissionTable::new().allow(
//!     "/items",
//!     HttpMethod::Get,
//!     MethodPermission::new().query("limit", Condition::compile(&RawCondition::new("$within", json!([1, 10])))?),
//! );
//! let app = Router::new()
//!     .route("/items", get(list_items))
//!     .layer(axum::middleware::from_fn_with_state(Gatekeeper::new(table, Default::default()), gatekeeper_middleware));
//! ```

pub mod auth;
pub mod condition;
pub mod config;
pub mod gatekeeper;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use auth::{authenticator_fn, AuthenticatorRegistry, RequestAuthenticator};
pub use condition::{Condition, RawCondition};
pub use config::GatekeeperConfig;
pub use gatekeeper::{
    GateContext, GateRequest, Gatekeeper, GatekeeperOptions, HttpMethod, MethodPermission, PermissionTable, Rejection,
};
pub use http::{gatekeeper_middleware, HttpServer};
pub use lifecycle::Shutdown;
