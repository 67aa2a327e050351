//! Condition evaluation.
//!
//! # Coercion rules
//! - Ordering: numbers numerically, a number against a numeric string by
//!   parsing the string, dates chronologically, strings by bytes,
//!   booleans with `false < true`. Everything else is not comparable.
//! - `$eq` is strict: same kind, same value (`5` equals `5.0`, not `"5"`).
//! - `$in` / `$nin` use loose equality: strict equality, numeric equality
//!   after coercion, or identical string forms of two scalars.
//! - An absent value equals nothing, so it passes only `$exists: false`
//!   and `$nin`.

use std::cmp::Ordering;

use serde_json::Value;

use super::kind::{coerce_number, parse_date, string_form, ValueKind};
use super::operator::Condition;

/// Returns true if `value` satisfies `condition`. Never panics; values that
/// cannot be compared simply fail.
pub fn evaluate(value: Option<&Value>, condition: &Condition) -> bool {
    let Some(value) = value else {
        return matches!(condition, Condition::Exists(false) | Condition::NotIn(_));
    };

    match condition {
        Condition::Lt(operand) => compare(value, operand) == Some(Ordering::Less),
        Condition::Lte(operand) => matches!(
            compare(value, operand),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Condition::Gt(operand) => compare(value, operand) == Some(Ordering::Greater),
        Condition::Gte(operand) => matches!(
            compare(value, operand),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Condition::Eq(operand) => strict_eq(value, operand),
        Condition::Within { lo, hi } => within(value, lo, hi),
        Condition::NotWithin { lo, hi } => {
            compare(value, lo) == Some(Ordering::Less)
                || compare(value, hi) == Some(Ordering::Greater)
        }
        Condition::Regex(re) => string_form(value).is_some_and(|s| re.is_match(&s)),
        Condition::In(items) => items.iter().any(|item| loose_eq(value, item)),
        Condition::NotIn(items) => !items.iter().any(|item| loose_eq(value, item)),
        Condition::Exists(expected) => *expected,
    }
}

fn within(value: &Value, lo: &Value, hi: &Value) -> bool {
    let above_lo = matches!(compare(lo, value), Some(Ordering::Less | Ordering::Equal));
    let below_hi = matches!(compare(value, hi), Some(Ordering::Less | Ordering::Equal));
    above_lo && below_hi
}

/// Order two values, or `None` if they are not comparable.
pub(crate) fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    use ValueKind::*;

    match (ValueKind::of(Some(left)), ValueKind::of(Some(right))) {
        (Number, Number) | (Number, String) | (String, Number) => {
            coerce_number(left)?.partial_cmp(&coerce_number(right)?)
        }
        (Date, Date) => Some(parse_date(left.as_str()?)?.cmp(&parse_date(right.as_str()?)?)),
        (String | Date, String | Date) => Some(left.as_str()?.cmp(right.as_str()?)),
        (Boolean, Boolean) => Some(left.as_bool()?.cmp(&right.as_bool()?)),
        _ => None,
    }
}

pub(crate) fn strict_eq(left: &Value, right: &Value) -> bool {
    let kind = ValueKind::of(Some(left));
    if kind != ValueKind::of(Some(right)) {
        return false;
    }
    match kind {
        ValueKind::Number => left.as_f64() == right.as_f64(),
        _ => left == right,
    }
}

pub(crate) fn loose_eq(left: &Value, right: &Value) -> bool {
    if strict_eq(left, right) {
        return true;
    }
    if let (Some(a), Some(b)) = (coerce_number(left), coerce_number(right)) {
        return a == b;
    }
    let scalars = ValueKind::of(Some(left)).is_scalar() && ValueKind::of(Some(right)).is_scalar();
    scalars && string_form(left) == string_form(right)
}
