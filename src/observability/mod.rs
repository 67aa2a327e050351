//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Gatekeeper decisions and server events produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;

pub use self::logging::init_tracing;
pub use self::metrics::{init_metrics, record_decision};
