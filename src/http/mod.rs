//! HTTP host for the gatekeeper.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup)
//!     → request.rs (request ID)
//!     → middleware/gatekeeper.rs (admit or reject)
//!     → server.rs handler (forward upstream, or echo gate context)
//!     → response.rs (strip hop-by-hop headers, map upstream errors)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use middleware::{gatekeeper_middleware, shared_gatekeeper_middleware, SharedGatekeeper};
pub use request::{MakeRequestUuid, RequestIdExt, X_REQUEST_ID};
pub use server::HttpServer;
