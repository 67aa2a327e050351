//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Pattern Compilation (at startup):
//!     permission table keys
//!     → pattern.rs (parse segments, validate shape)
//!     → compass.rs (insert into segment tree)
//!     → Freeze as immutable Compass
//!
//! Incoming Request (path)
//!     → compass.rs (walk tree, literal > param > wildcard)
//!     → Return: PatternMatch or None
//! ```
//!
//! # Design Decisions
//! - Patterns compiled at startup, immutable at runtime
//! - No regex in the hot path, only segment comparisons
//! - Deterministic: same path always resolves to the same pattern

pub mod compass;
pub mod pattern;

pub use compass::{Compass, PatternMatch};
pub use pattern::PatternError;
