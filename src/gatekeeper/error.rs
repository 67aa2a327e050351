//! Construction-time errors.

use thiserror::Error;

use crate::condition::ConditionError;
use crate::routing::PatternError;

/// One problem found while building a gatekeeper.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("{location}: `{key}`: {source}")]
    Condition {
        location: String,
        key: String,
        #[source]
        source: ConditionError,
    },

    #[error("{location}: invalid header name `{name}`")]
    HeaderName { location: String, name: String },

    /// Two header keys that differ only in case.
    #[error("{location}: header `{name}` is listed more than once")]
    DuplicateHeader { location: String, name: String },

    #[error("{location}: unsupported method `{method}`")]
    Method { location: String, method: String },

    #[error("{location}: unknown authenticator `{name}`")]
    UnknownAuthenticator { location: String, name: String },
}

/// Every problem found while building a gatekeeper.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{}", join(.0))]
pub struct BuildErrors(pub Vec<BuildError>);

impl BuildErrors {
    pub fn iter(&self) -> impl Iterator<Item = &BuildError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BuildError> for BuildErrors {
    fn from(error: BuildError) -> Self {
        Self(vec![error])
    }
}

fn join(errors: &[BuildError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}
