//! URL pattern parsing.
//!
//! A pattern is a `/`-separated list of segments:
//! - `users` literal, matched exactly (case-sensitive)
//! - `:id` parameter, matches one non-empty segment
//! - `*` or `*rest` wildcard, matches one or more trailing segments

use thiserror::Error;

/// Errors raised while registering a pattern.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern `{0}` must start with `/`")]
    MissingLeadingSlash(String),

    #[error("pattern `{0}` has a parameter without a name")]
    EmptyParamName(String),

    #[error("pattern `{0}` has a wildcard that is not the last segment")]
    WildcardNotLast(String),

    #[error("pattern `{pattern}` names parameter `{found}` where `{existing}` is already registered")]
    ConflictingParam {
        pattern: String,
        existing: String,
        found: String,
    },

    #[error("pattern `{pattern}` names wildcard `{found}` where `{existing}` is already registered")]
    ConflictingWildcard {
        pattern: String,
        existing: String,
        found: String,
    },

    #[error("pattern `{pattern}` is indistinguishable from registered pattern `{existing}`")]
    Ambiguous { pattern: String, existing: String },
}

/// One parsed pattern segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
    /// Trailing catch-all; `None` for an anonymous `*`.
    Wildcard(Option<String>),
}

impl Segment {
    fn parse(raw: &str, pattern: &str) -> Result<Self, PatternError> {
        if let Some(name) = raw.strip_prefix(':') {
            if name.is_empty() {
                return Err(PatternError::EmptyParamName(pattern.to_string()));
            }
            return Ok(Segment::Param(name.to_string()));
        }
        if let Some(name) = raw.strip_prefix('*') {
            let name = (!name.is_empty()).then(|| name.to_string());
            return Ok(Segment::Wildcard(name));
        }
        Ok(Segment::Literal(raw.to_string()))
    }
}

/// Split a concrete path into its non-empty segments.
pub fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Parse a pattern into segments, validating its shape.
pub fn parse_pattern(pattern: &str) -> Result<Vec<Segment>, PatternError> {
    if !pattern.starts_with('/') {
        return Err(PatternError::MissingLeadingSlash(pattern.to_string()));
    }

    let segments = path_segments(pattern)
        .map(|raw| Segment::parse(raw, pattern))
        .collect::<Result<Vec<_>, _>>()?;

    let wildcard_position = segments
        .iter()
        .position(|s| matches!(s, Segment::Wildcard(_)));
    if let Some(pos) = wildcard_position {
        if pos + 1 != segments.len() {
            return Err(PatternError::WildcardNotLast(pattern.to_string()));
        }
    }

    Ok(segments)
}
