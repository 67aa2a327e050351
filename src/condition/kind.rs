//! Dynamic type classification for condition values and operands.
//!
//! Every place that needs to know "what kind of value is this" goes through
//! [`ValueKind::of`], so the evaluator, the condition compiler and the
//! rejection messages all agree on the same classification.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

/// The dynamic kind of a value seen by the condition evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Number,
    String,
    Boolean,
    Null,
    /// The value is not present at all (missing parameter or header).
    Undefined,
    Array,
    Object,
    /// A string holding an RFC 3339 timestamp.
    Date,
    /// A compiled pattern operand. Request data never classifies as this.
    Regex,
}

impl ValueKind {
    /// Classify an optional value. `None` is [`ValueKind::Undefined`].
    pub fn of(value: Option<&Value>) -> Self {
        match value {
            None => ValueKind::Undefined,
            Some(Value::Null) => ValueKind::Null,
            Some(Value::Bool(_)) => ValueKind::Boolean,
            Some(Value::Number(_)) => ValueKind::Number,
            Some(Value::String(s)) if parse_date(s).is_some() => ValueKind::Date,
            Some(Value::String(_)) => ValueKind::String,
            Some(Value::Array(_)) => ValueKind::Array,
            Some(Value::Object(_)) => ValueKind::Object,
        }
    }

    /// Whether values of this kind have a meaningful string form.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            ValueKind::Number
                | ValueKind::String
                | ValueKind::Boolean
                | ValueKind::Null
                | ValueKind::Date
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Boolean => "boolean",
            ValueKind::Null => "null",
            ValueKind::Undefined => "undefined",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
            ValueKind::Date => "date",
            ValueKind::Regex => "regex",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn parse_date(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s).ok()
}

/// Interpret a value as a finite number: numbers directly, strings when the
/// trimmed text parses as one.
pub(crate) fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// The text a `$regex` condition is matched against.
pub(crate) fn string_form(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some("null".to_string()),
        Value::Array(items) => {
            let parts: Option<Vec<String>> = items.iter().map(string_form).collect();
            parts.map(|p| p.join(","))
        }
        Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classification() {
        assert_eq!(ValueKind::of(None), ValueKind::Undefined);
        assert_eq!(ValueKind::of(Some(&json!(null))), ValueKind::Null);
        assert_eq!(ValueKind::of(Some(&json!(3))), ValueKind::Number);
        assert_eq!(ValueKind::of(Some(&json!(2.5))), ValueKind::Number);
        assert_eq!(ValueKind::of(Some(&json!("abc"))), ValueKind::String);
        assert_eq!(ValueKind::of(Some(&json!(true))), ValueKind::Boolean);
        assert_eq!(ValueKind::of(Some(&json!([1, 2]))), ValueKind::Array);
        assert_eq!(ValueKind::of(Some(&json!({"a": 1}))), ValueKind::Object);
        assert_eq!(
            ValueKind::of(Some(&json!("2024-05-01T10:00:00Z"))),
            ValueKind::Date
        );
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(&json!("5")), Some(5.0));
        assert_eq!(coerce_number(&json!(" 7.5 ")), Some(7.5));
        assert_eq!(coerce_number(&json!(12)), Some(12.0));
        assert_eq!(coerce_number(&json!("")), None);
        assert_eq!(coerce_number(&json!("abc")), None);
        assert_eq!(coerce_number(&json!("NaN")), None);
        assert_eq!(coerce_number(&json!("inf")), None);
        assert_eq!(coerce_number(&json!(true)), None);
    }

    #[test]
    fn test_string_form() {
        assert_eq!(string_form(&json!("x")).as_deref(), Some("x"));
        assert_eq!(string_form(&json!(10)).as_deref(), Some("10"));
        assert_eq!(string_form(&json!(["a", 1])).as_deref(), Some("a,1"));
        assert_eq!(string_form(&json!({"a": 1})), None);
    }
}
