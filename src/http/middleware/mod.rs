//! Axum middleware.

pub mod gatekeeper;

pub use gatekeeper::{gatekeeper_middleware, shared_gatekeeper_middleware, SharedGatekeeper};
