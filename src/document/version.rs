use super::ProjectRecord;
use super::coerce::{array_value, is_record, record_value};
use serde_json::Value;

/// The newest schema generation this crate knows how to produce.
pub const CURRENT_PROJECT_VERSION: u32 = 3;

/// The generation a record claims through its `version` field, if any.
///
/// Negative, fractional or non-numeric values are treated as absent.
pub fn declared_version(record: &ProjectRecord) -> Option<u32> {
    let version = record.get("version").and_then(Value::as_f64)?;
    if !version.is_finite() || version < 0.0 || version.fract() != 0.0 {
        return None;
    }
    Some(version.min(u32::MAX as f64) as u32)
}

/// The generation implied by the fields a record already carries.
pub fn inferred_version(record: &ProjectRecord) -> u32 {
    let metadata = record_value(record.get("metadata"));
    if metadata
        .and_then(|metadata| metadata.get("duration"))
        .is_some_and(Value::is_number)
    {
        return 3;
    }

    if metadata.is_some() && is_record(record.get("settings")) {
        return 2;
    }

    if array_value(record.get("scenes")).is_some_and(|scenes| !scenes.is_empty()) {
        return 1;
    }

    0
}

/// The generation used to pick the next migration step: the higher of the
/// declared and inferred generations. A record with a stale or missing
/// `version` but a newer shape is never pushed back through an older step.
pub fn detect_version(record: &ProjectRecord) -> u32 {
    declared_version(record)
        .unwrap_or(0)
        .max(inferred_version(record))
}
