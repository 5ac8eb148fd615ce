//! Option-value helpers: falsy exclusion and structural de-duplication.
//!
//! Subscription options are arbitrary JSON. Producers care about the
//! *distinct parameterizations* being watched, not how many listeners share
//! each one, so duplicates are removed by deep structural equality — two
//! independently built but field-equal objects count as one. Falsy options
//! (null, false, zero, empty string) mean "no parameterization" and are
//! excluded entirely.

use serde_json::Value;

/// Whether an options value counts as "no options".
#[must_use]
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f.abs() < f64::EPSILON),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Distinct, falsy-excluded options in first-seen order.
///
/// `Value`'s `PartialEq` is recursive field-wise comparison (object member
/// order does not matter), which is exactly the deep equality required here.
#[must_use]
pub fn distinct_options<'a>(options: impl IntoIterator<Item = &'a Value>) -> Vec<Value> {
    let mut distinct: Vec<Value> = Vec::new();
    for opt in options {
        if is_falsy(opt) {
            continue;
        }
        if !distinct.iter().any(|seen| seen == opt) {
            distinct.push(opt.clone());
        }
    }
    distinct
}
