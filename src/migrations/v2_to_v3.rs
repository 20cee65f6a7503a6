//! Derived project duration.
//!
//! Adds `metadata.duration`, the latest element end time on the main
//! scene.

use super::{MigrationOutcome, SkipReason};
use crate::document::scenes::project_duration_from_scenes;
use crate::document::{
    IdLocation, ProjectRecord, array_value, merge_fields, number_to_json, record_value, resolve_id,
};
use serde_json::{Map, Value, json};

const ID_LOCATIONS: &[IdLocation] = &[IdLocation::Root("id"), IdLocation::Nested("metadata", "id")];

pub fn project_id(project: &ProjectRecord) -> Option<String> {
    resolve_id(project, ID_LOCATIONS)
}

pub fn transform_v2_to_v3(project: &ProjectRecord) -> MigrationOutcome<'_> {
    if project_id(project).is_none() {
        return MigrationOutcome::skipped(project, SkipReason::NoProjectId);
    }

    if is_v3_project(project) {
        return MigrationOutcome::skipped(project, SkipReason::AlreadyV3);
    }

    let scenes = array_value(project.get("scenes"))
        .map(Vec::as_slice)
        .unwrap_or_default();
    let duration = number_to_json(project_duration_from_scenes(scenes));

    let metadata = match record_value(project.get("metadata")) {
        Some(existing) => merge_fields(existing, [("duration", duration)]),
        None => Map::from_iter([("duration".to_string(), duration)]),
    };

    MigrationOutcome::migrated(merge_fields(
        project,
        [("metadata", Value::Object(metadata)), ("version", json!(3))],
    ))
}

fn is_v3_project(project: &ProjectRecord) -> bool {
    if project
        .get("version")
        .and_then(Value::as_f64)
        .is_some_and(|version| version >= 3.0)
    {
        return true;
    }

    record_value(project.get("metadata"))
        .and_then(|metadata| metadata.get("duration"))
        .is_some_and(Value::is_number)
}
