//! Scene bootstrapping.
//!
//! Guarantees every project carries a non-empty `scenes` list and a
//! `currentSceneId` by synthesizing a single main scene.

use super::{MigrationOutcome, SkipReason, TransformOptions};
use crate::document::scenes::{MAIN_SCENE_NAME, default_scene_value, iso_timestamp};
use crate::document::{IdLocation, ProjectRecord, array_value, merge_fields, record_value, resolve_id};
use serde_json::{Value, json};

const ID_LOCATIONS: &[IdLocation] = &[IdLocation::Root("id"), IdLocation::Nested("metadata", "id")];

pub fn project_id(project: &ProjectRecord) -> Option<String> {
    resolve_id(project, ID_LOCATIONS)
}

pub fn transform_v0_to_v1<'a>(
    project: &'a ProjectRecord,
    options: &TransformOptions,
) -> MigrationOutcome<'a> {
    if array_value(project.get("scenes")).is_some_and(|scenes| !scenes.is_empty()) {
        return MigrationOutcome::skipped(project, SkipReason::AlreadyHasScenes);
    }

    let now = options.now();
    let main_scene = default_scene_value(MAIN_SCENE_NAME, true, now);
    let main_scene_id = main_scene["id"].clone();

    let mut migrated = merge_fields(
        project,
        [
            ("scenes", Value::Array(vec![main_scene])),
            ("currentSceneId", main_scene_id),
            ("version", json!(1)),
        ],
    );

    let updated_at = Value::String(iso_timestamp(now));
    match record_value(project.get("metadata")) {
        Some(metadata) => {
            let metadata = merge_fields(metadata, [("updatedAt", updated_at)]);
            migrated.insert("metadata".to_string(), Value::Object(metadata));
        }
        None => {
            migrated.insert("updatedAt".to_string(), updated_at);
        }
    }

    MigrationOutcome::migrated(migrated)
}
