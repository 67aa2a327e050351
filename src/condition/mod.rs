//! Condition evaluation subsystem.
//!
//! # Data Flow
//! ```text
//! Configuration (RawCondition, one-operator map)
//!     → operator.rs (compile, validate operand shape)
//!     → Condition (typed, immutable)
//!
//! Per request:
//!     runtime value (query param / header, maybe absent)
//!     → kind.rs (classify, coerce)
//!     → evaluate.rs (pass / fail)
//! ```
//!
//! # Design Decisions
//! - Exactly one operator per condition; composition happens per field
//! - Malformed conditions are rejected at compile time, never per request
//! - Evaluation is pure and never panics: incomparable values fail

pub mod evaluate;
pub mod kind;
pub mod operator;

pub use evaluate::evaluate;
pub use kind::ValueKind;
pub use operator::{Condition, ConditionError, RawCondition};
