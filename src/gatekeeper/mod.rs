//! Policy-driven request gatekeeper.
//!
//! # Data Flow
//! ```text
//! GateRequest (method, path, query, headers)
//!     → Compass::find                → 404 No such path configured
//!     → method table lookup          → 405 Method not allowed
//!     → query arity / conditions     → 400
//!     → combine_headers + conditions → 400
//!     → GateContext attached
//!     → authenticators               → 401 Authentication failed
//!     → GuardedRequest (admitted)
//! ```
//!
//! # Design Decisions
//! - The pipeline is host-agnostic; `http::middleware` adapts it to axum
//! - Configuration is compiled once; a broken table yields a gatekeeper
//!   that answers every request with 500 rather than a partial one

pub mod builder;
pub mod error;
pub mod headers;
pub mod permissions;
pub mod pipeline;
pub mod rejection;
pub mod request;

pub use error::{BuildError, BuildErrors};
pub use headers::combine_headers;
pub use permissions::{
    HeaderConditions, HttpMethod, MethodPermission, MethodTable, PermissionTable, QueryConditions,
};
pub use pipeline::{Gatekeeper, GatekeeperOptions};
pub use rejection::{Rejection, RejectionKind};
pub use request::{GateContext, GateRequest, GuardedRequest, QueryParams};
