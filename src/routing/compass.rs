//! Segment-indexed pattern tree.
//!
//! # Responsibilities
//! - Register URL patterns once at construction
//! - Resolve a concrete path to exactly one registered pattern
//! - Capture `:param` segments and the wildcard tail
//!
//! # Design Decisions
//! - Lookup walks one tree level per path segment; the number of
//!   registered patterns does not matter
//! - Precedence at every level: literal > parameter > wildcard
//! - A branch that dead-ends deeper down falls back to the next kind,
//!   so `/users/me` and `/users/:id/posts` both resolve as expected
//! - Immutable after construction; `find` takes `&self` and allocates
//!   only the returned match

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::routing::pattern::{parse_pattern, path_segments, PatternError, Segment};

/// Result of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternMatch {
    /// The pattern exactly as it was registered.
    pub pattern: String,
    /// Captured `:param` values (and a named wildcard tail).
    pub params: BTreeMap<String, String>,
    /// Segments consumed by a trailing wildcard, joined with `/`.
    pub wildcard: Option<String>,
}

#[derive(Debug, Default)]
struct Node {
    /// Registered pattern terminating at this node.
    pattern: Option<String>,
    literals: HashMap<String, Node>,
    param: Option<(String, Box<Node>)>,
    wildcard: Option<WildcardLeaf>,
}

#[derive(Debug)]
struct WildcardLeaf {
    name: Option<String>,
    pattern: String,
}

/// The path matcher.
#[derive(Debug, Default)]
pub struct Compass {
    root: Node,
    len: usize,
}

impl Compass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pattern. Registering the same pattern twice is a no-op.
    pub fn define(&mut self, pattern: &str) -> Result<(), PatternError> {
        let segments = parse_pattern(pattern)?;
        let mut node = &mut self.root;

        for segment in segments {
            match segment {
                Segment::Literal(lit) => {
                    node = node.literals.entry(lit).or_default();
                }
                Segment::Param(name) => {
                    let (existing, child) = node
                        .param
                        .get_or_insert_with(|| (name.clone(), Box::default()));
                    if *existing != name {
                        return Err(PatternError::ConflictingParam {
                            pattern: pattern.to_string(),
                            existing: existing.clone(),
                            found: name,
                        });
                    }
                    node = &mut **child;
                }
                Segment::Wildcard(name) => {
                    if let Some(leaf) = &node.wildcard {
                        if leaf.name != name {
                            return Err(PatternError::ConflictingWildcard {
                                pattern: pattern.to_string(),
                                existing: leaf.name.clone().unwrap_or_else(|| "*".into()),
                                found: name.unwrap_or_else(|| "*".into()),
                            });
                        }
                        return register_duplicate(&leaf.pattern, pattern);
                    }
                    node.wildcard = Some(WildcardLeaf {
                        name,
                        pattern: pattern.to_string(),
                    });
                    self.len += 1;
                    return Ok(());
                }
            }
        }

        if let Some(existing) = &node.pattern {
            return register_duplicate(existing, pattern);
        }
        node.pattern = Some(pattern.to_string());
        self.len += 1;
        Ok(())
    }

    /// Resolve a concrete path, or `None` if no registered pattern matches.
    pub fn find(&self, path: &str) -> Option<PatternMatch> {
        let segments: Vec<&str> = path_segments(path).collect();
        let mut captures = Vec::new();
        let (pattern, wildcard) = walk(&self.root, &segments, &mut captures)?;

        let mut params: BTreeMap<String, String> = captures
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        if let Some((Some(name), tail)) = &wildcard {
            params.insert(name.to_string(), tail.clone());
        }

        Some(PatternMatch {
            pattern: pattern.to_string(),
            params,
            wildcard: wildcard.map(|(_, tail)| tail),
        })
    }

    /// Number of distinct registered patterns.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn register_duplicate(existing: &str, pattern: &str) -> Result<(), PatternError> {
    if existing == pattern {
        Ok(())
    } else {
        Err(PatternError::Ambiguous {
            pattern: pattern.to_string(),
            existing: existing.to_string(),
        })
    }
}

type WildcardCapture<'a> = Option<(Option<&'a str>, String)>;

fn walk<'n, 'p>(
    node: &'n Node,
    segments: &[&'p str],
    captures: &mut Vec<(&'n str, &'p str)>,
) -> Option<(&'n str, WildcardCapture<'n>)> {
    let Some((head, rest)) = segments.split_first() else {
        return node.pattern.as_deref().map(|p| (p, None));
    };

    if let Some(child) = node.literals.get(*head) {
        if let Some(found) = walk(child, rest, captures) {
            return Some(found);
        }
    }

    if let Some((name, child)) = &node.param {
        captures.push((name.as_str(), *head));
        if let Some(found) = walk(child, rest, captures) {
            return Some(found);
        }
        captures.pop();
    }

    node.wildcard.as_ref().map(|leaf| {
        let tail = segments.join("/");
        (leaf.pattern.as_str(), Some((leaf.name.as_deref(), tail)))
    })
}
