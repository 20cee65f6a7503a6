//! Total helpers for reading untyped document fields.
//!
//! Every accessor takes the raw `Option<&Value>` returned by a map lookup so
//! a missing field and a wrong-typed field degrade the same way: to the
//! caller's fallback.

use super::ProjectRecord;
use serde_json::{Number, Value};

/// Returns `true` when the value is a plain JSON object.
pub fn is_record(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::Object(_)))
}

pub fn record_value(value: Option<&Value>) -> Option<&ProjectRecord> {
    value.and_then(Value::as_object)
}

pub fn array_value(value: Option<&Value>) -> Option<&Vec<Value>> {
    value.and_then(Value::as_array)
}

pub fn optional_string(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str)
}

/// Returns the string if the value is one, else `fallback`.
pub fn string_value<'a>(value: Option<&'a Value>, fallback: &'a str) -> &'a str {
    optional_string(value).unwrap_or(fallback)
}

/// Returns the number if the value is one, else `fallback`.
pub fn number_value(value: Option<&Value>, fallback: f64) -> f64 {
    value.and_then(Value::as_f64).unwrap_or(fallback)
}

/// Converts a coerced number back to JSON, keeping whole numbers integral so
/// that `30` read from a document is written back as `30`, not `30.0`.
pub fn number_to_json(number: f64) -> Value {
    if number.is_finite()
        && number.fract() == 0.0
        && number >= i64::MIN as f64
        && number <= i64::MAX as f64
    {
        return Value::Number(Number::from(number as i64));
    }

    Number::from_f64(number)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Builds a new record from `base` with each override replacing the field of
/// the same name. Fields not named in `overrides` keep their exact presence
/// and value.
pub fn merge_fields<I, K>(base: &ProjectRecord, overrides: I) -> ProjectRecord
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    let mut merged = base.clone();
    for (key, value) in overrides {
        merged.insert(key.into(), value);
    }
    merged
}

/// Where a schema generation keeps the project id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdLocation {
    /// A top-level field.
    Root(&'static str),
    /// A field inside a top-level record.
    Nested(&'static str, &'static str),
}

/// Root `id`, then `metadata.id`: where every generation so far keeps it.
pub const PROJECT_ID_LOCATIONS: &[IdLocation] =
    &[IdLocation::Root("id"), IdLocation::Nested("metadata", "id")];

/// Resolves the project id by probing `locations` in order. Only non-empty
/// strings count as an id.
pub fn resolve_id(record: &ProjectRecord, locations: &[IdLocation]) -> Option<String> {
    locations.iter().find_map(|location| {
        let candidate = match location {
            IdLocation::Root(field) => record.get(*field),
            IdLocation::Nested(parent, field) => {
                record_value(record.get(*parent)).and_then(|nested| nested.get(*field))
            }
        };
        optional_string(candidate)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    })
}
