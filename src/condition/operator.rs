//! Condition operators and their compilation from raw configuration.
//!
//! A raw condition is a one-entry map such as `{ "$within" = [1, 10] }`.
//! It is compiled once into a typed [`Condition`]; every shape problem is
//! reported as a [`ConditionError`] at that point instead of per request.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use super::kind::ValueKind;

pub const LT: &str = "$lt";
pub const LTE: &str = "$lte";
pub const EQ: &str = "$eq";
pub const GTE: &str = "$gte";
pub const GT: &str = "$gt";
pub const EXISTS: &str = "$exists";
pub const WITHIN: &str = "$within";
pub const NOT_WITHIN: &str = "$nwithin";
pub const REGEX: &str = "$regex";
pub const IN: &str = "$in";
pub const NOT_IN: &str = "$nin";

/// Errors produced while compiling a raw condition.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConditionError {
    #[error("a condition takes exactly one operator, found {0}")]
    OperatorCount(usize),

    #[error("unsupported operator `{0}`")]
    UnknownOperator(String),

    #[error("operator `{operator}` expects {expected}, found {found}")]
    InvalidOperand {
        operator: &'static str,
        expected: &'static str,
        found: ValueKind,
    },

    #[error("invalid `$regex` pattern: {0}")]
    InvalidRegex(String),
}

/// A condition exactly as written in configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawCondition(pub BTreeMap<String, Value>);

impl RawCondition {
    /// Build a single-operator raw condition.
    pub fn new(operator: impl Into<String>, operand: Value) -> Self {
        let mut map = BTreeMap::new();
        map.insert(operator.into(), operand);
        Self(map)
    }
}

/// A compiled single-operator predicate.
#[derive(Debug, Clone)]
pub enum Condition {
    Lt(Value),
    Lte(Value),
    Eq(Value),
    Gte(Value),
    Gt(Value),
    Exists(bool),
    Within { lo: Value, hi: Value },
    NotWithin { lo: Value, hi: Value },
    Regex(Regex),
    In(Vec<Value>),
    NotIn(Vec<Value>),
}

impl Condition {
    /// Compile a raw condition, validating its operator and operand shape.
    pub fn compile(raw: &RawCondition) -> Result<Self, ConditionError> {
        if raw.0.len() != 1 {
            return Err(ConditionError::OperatorCount(raw.0.len()));
        }
        let Some((operator, operand)) = raw.0.iter().next() else {
            return Err(ConditionError::OperatorCount(0));
        };

        match operator.as_str() {
            LT => Ok(Condition::Lt(ordered_operand(LT, operand)?)),
            LTE => Ok(Condition::Lte(ordered_operand(LTE, operand)?)),
            GTE => Ok(Condition::Gte(ordered_operand(GTE, operand)?)),
            GT => Ok(Condition::Gt(ordered_operand(GT, operand)?)),
            EQ => Ok(Condition::Eq(operand.clone())),
            EXISTS => match operand {
                Value::Bool(b) => Ok(Condition::Exists(*b)),
                other => Err(invalid(EXISTS, "a boolean", other)),
            },
            WITHIN => {
                let (lo, hi) = range_operand(WITHIN, operand)?;
                Ok(Condition::Within { lo, hi })
            }
            NOT_WITHIN => {
                let (lo, hi) = range_operand(NOT_WITHIN, operand)?;
                Ok(Condition::NotWithin { lo, hi })
            }
            REGEX => match operand {
                Value::String(pattern) => Regex::new(pattern)
                    .map(Condition::Regex)
                    .map_err(|e| ConditionError::InvalidRegex(e.to_string())),
                other => Err(invalid(REGEX, "a pattern string", other)),
            },
            IN => Ok(Condition::In(list_operand(IN, operand)?)),
            NOT_IN => Ok(Condition::NotIn(list_operand(NOT_IN, operand)?)),
            unknown => Err(ConditionError::UnknownOperator(unknown.to_string())),
        }
    }

    /// The operator keyword, e.g. `$within`.
    pub fn operator(&self) -> &'static str {
        match self {
            Condition::Lt(_) => LT,
            Condition::Lte(_) => LTE,
            Condition::Eq(_) => EQ,
            Condition::Gte(_) => GTE,
            Condition::Gt(_) => GT,
            Condition::Exists(_) => EXISTS,
            Condition::Within { .. } => WITHIN,
            Condition::NotWithin { .. } => NOT_WITHIN,
            Condition::Regex(_) => REGEX,
            Condition::In(_) => IN,
            Condition::NotIn(_) => NOT_IN,
        }
    }

    /// Kind of the operand this condition carries.
    pub fn operand_kind(&self) -> ValueKind {
        match self {
            Condition::Regex(_) => ValueKind::Regex,
            Condition::Exists(_) => ValueKind::Boolean,
            Condition::Within { .. }
            | Condition::NotWithin { .. }
            | Condition::In(_)
            | Condition::NotIn(_) => ValueKind::Array,
            Condition::Lt(v) | Condition::Lte(v) | Condition::Eq(v) | Condition::Gte(v) | Condition::Gt(v) => {
                ValueKind::of(Some(v))
            }
        }
    }

    /// Convert back to the configuration form.
    pub fn to_raw(&self) -> RawCondition {
        let operand = match self {
            Condition::Lt(v) | Condition::Lte(v) | Condition::Eq(v) | Condition::Gte(v) | Condition::Gt(v) => {
                v.clone()
            }
            Condition::Exists(b) => Value::Bool(*b),
            Condition::Within { lo, hi } | Condition::NotWithin { lo, hi } => {
                Value::Array(vec![lo.clone(), hi.clone()])
            }
            Condition::Regex(re) => Value::String(re.as_str().to_string()),
            Condition::In(items) | Condition::NotIn(items) => Value::Array(items.clone()),
        };
        RawCondition::new(self.operator(), operand)
    }
}

impl TryFrom<&RawCondition> for Condition {
    type Error = ConditionError;

    fn try_from(raw: &RawCondition) -> Result<Self, Self::Error> {
        Self::compile(raw)
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_raw().serialize(serializer)
    }
}

/// JSON-like rendering used in rejection messages. Patterns are shown as
/// `/pattern/` rather than as an escaped JSON string.
impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.operand_kind(), self) {
            (ValueKind::Regex, Condition::Regex(re)) => {
                write!(f, "{{\"{}\": /{}/}}", REGEX, re.as_str())
            }
            _ => {
                let raw = self.to_raw();
                let rendered = serde_json::to_string(&raw).map_err(|_| fmt::Error)?;
                f.write_str(&rendered)
            }
        }
    }
}

fn invalid(operator: &'static str, expected: &'static str, found: &Value) -> ConditionError {
    ConditionError::InvalidOperand {
        operator,
        expected,
        found: ValueKind::of(Some(found)),
    }
}

fn ordered_operand(operator: &'static str, operand: &Value) -> Result<Value, ConditionError> {
    match ValueKind::of(Some(operand)) {
        ValueKind::Number | ValueKind::String | ValueKind::Date | ValueKind::Boolean => {
            Ok(operand.clone())
        }
        _ => Err(invalid(operator, "a number, string or date", operand)),
    }
}

fn range_operand(operator: &'static str, operand: &Value) -> Result<(Value, Value), ConditionError> {
    match operand {
        Value::Array(items) if items.len() == 2 => {
            let lo = ordered_operand(operator, &items[0])?;
            let hi = ordered_operand(operator, &items[1])?;
            Ok((lo, hi))
        }
        other => Err(invalid(operator, "a two-element [lo, hi] array", other)),
    }
}

fn list_operand(operator: &'static str, operand: &Value) -> Result<Vec<Value>, ConditionError> {
    match operand {
        Value::Array(items) => Ok(items.clone()),
        other => Err(invalid(operator, "an array", other)),
    }
}
