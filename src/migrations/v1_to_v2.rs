//! Metadata and settings normalization.
//!
//! Folds the flat legacy fields into nested `metadata` and `settings`
//! records and moves root-level bookmarks onto the main scene.

use super::{MigrationOutcome, SkipReason, TransformOptions};
use crate::document::scenes::{iso_timestamp, main_scene_id};
use crate::document::{
    CanvasSize, DEFAULT_BACKGROUND_COLOR, DEFAULT_BLUR_INTENSITY, DEFAULT_CANVAS_SIZE,
    DEFAULT_FPS, IdLocation, ProjectRecord, array_value, is_record, merge_fields,
    number_to_json, number_value, optional_string, record_value, resolve_id, string_value,
};
use serde_json::{Map, Value, json};

const ID_LOCATIONS: &[IdLocation] = &[IdLocation::Root("id"), IdLocation::Nested("metadata", "id")];

pub fn project_id(project: &ProjectRecord) -> Option<String> {
    resolve_id(project, ID_LOCATIONS)
}

pub fn transform_v1_to_v2(project: &ProjectRecord) -> MigrationOutcome<'_> {
    transform_v1_to_v2_with(project, &TransformOptions::default())
}

/// Same as [`transform_v1_to_v2`] with a pinned clock for timestamps that
/// have to be invented.
pub fn transform_v1_to_v2_with<'a>(
    project: &'a ProjectRecord,
    options: &TransformOptions,
) -> MigrationOutcome<'a> {
    let Some(project_id) = project_id(project) else {
        return MigrationOutcome::skipped(project, SkipReason::NoProjectId);
    };

    if is_v2_project(project) {
        return MigrationOutcome::skipped(project, SkipReason::AlreadyV2);
    }

    let now = iso_timestamp(options.now());
    MigrationOutcome::migrated(migrate_project(project, &project_id, &now))
}

/// Lenient on purpose: both nested records present counts as migrated even
/// with a stale `version`.
fn is_v2_project(project: &ProjectRecord) -> bool {
    if project
        .get("version")
        .and_then(Value::as_f64)
        .is_some_and(|version| version >= 2.0)
    {
        return true;
    }

    is_record(project.get("metadata")) && is_record(project.get("settings"))
}

fn migrate_project(project: &ProjectRecord, project_id: &str, now: &str) -> ProjectRecord {
    let metadata = match record_value(project.get("metadata")) {
        Some(existing) => build_metadata(existing, project_id, now),
        None => build_metadata(project, project_id, now),
    };

    let scenes = array_value(project.get("scenes"))
        .map(Vec::as_slice)
        .unwrap_or_default();
    let legacy_bookmarks = array_value(project.get("bookmarks"));
    let scenes = apply_legacy_bookmarks(scenes, legacy_bookmarks);

    let settings = match record_value(project.get("settings")) {
        Some(existing) => build_settings(
            existing.get("fps"),
            existing.get("canvasSize"),
            background_value(existing.get("background"), LegacyBackground::default()),
        ),
        None => build_settings(
            project.get("fps"),
            project.get("canvasSize"),
            background_value(
                project.get("background"),
                LegacyBackground {
                    kind: project.get("backgroundType"),
                    color: project.get("backgroundColor"),
                    blur_intensity: project.get("blurIntensity"),
                },
            ),
        ),
    };

    let current_scene_id = current_scene_id(project.get("currentSceneId"), &scenes);

    merge_fields(
        project,
        [
            ("metadata", metadata),
            ("scenes", Value::Array(scenes)),
            ("currentSceneId", Value::String(current_scene_id)),
            ("settings", settings),
            ("version", json!(2)),
        ],
    )
}

/// Builds `metadata` from either an existing metadata record or the flat
/// root fields; both carry the same field names.
fn build_metadata(source: &ProjectRecord, project_id: &str, now: &str) -> Value {
    let mut metadata = Map::new();
    metadata.insert(
        "id".to_string(),
        json!(string_value(source.get("id"), project_id)),
    );
    metadata.insert("name".to_string(), json!(string_value(source.get("name"), "")));
    if let Some(thumbnail) = optional_string(source.get("thumbnail")) {
        metadata.insert("thumbnail".to_string(), json!(thumbnail));
    }
    metadata.insert(
        "createdAt".to_string(),
        json!(string_value(source.get("createdAt"), now)),
    );
    metadata.insert(
        "updatedAt".to_string(),
        json!(string_value(source.get("updatedAt"), now)),
    );
    Value::Object(metadata)
}

fn build_settings(fps: Option<&Value>, canvas_size: Option<&Value>, background: Value) -> Value {
    let canvas_size = canvas_size_value(canvas_size, DEFAULT_CANVAS_SIZE);
    json!({
        "fps": number_to_json(number_value(fps, DEFAULT_FPS)),
        "canvasSize": {
            "width": number_to_json(canvas_size.width),
            "height": number_to_json(canvas_size.height),
        },
        "background": background,
    })
}

fn canvas_size_value(value: Option<&Value>, fallback: CanvasSize) -> CanvasSize {
    match record_value(value) {
        Some(size) => CanvasSize {
            width: number_value(size.get("width"), fallback.width),
            height: number_value(size.get("height"), fallback.height),
        },
        None => fallback,
    }
}

/// Pre-v2 flat background fields.
#[derive(Default)]
struct LegacyBackground<'a> {
    kind: Option<&'a Value>,
    color: Option<&'a Value>,
    blur_intensity: Option<&'a Value>,
}

/// A structured `background` record wins; otherwise the legacy
/// `backgroundType` picks the variant.
fn background_value(structured: Option<&Value>, legacy: LegacyBackground<'_>) -> Value {
    if let Some(background) = record_value(structured) {
        return if optional_string(background.get("type")) == Some("blur") {
            blur_background(background.get("blurIntensity"))
        } else {
            color_background(background.get("color"))
        };
    }

    if optional_string(legacy.kind) == Some("blur") {
        blur_background(legacy.blur_intensity)
    } else {
        color_background(legacy.color)
    }
}

fn blur_background(intensity: Option<&Value>) -> Value {
    json!({
        "type": "blur",
        "blurIntensity": number_to_json(number_value(intensity, DEFAULT_BLUR_INTENSITY)),
    })
}

fn color_background(color: Option<&Value>) -> Value {
    json!({
        "type": "color",
        "color": string_value(color, DEFAULT_BACKGROUND_COLOR),
    })
}

/// Copies non-empty root bookmarks onto the main scene unless that scene
/// already has bookmarks of its own. When no scene has a string id the
/// first record scene is the target.
fn apply_legacy_bookmarks(scenes: &[Value], legacy: Option<&Vec<Value>>) -> Vec<Value> {
    let Some(legacy) = legacy.filter(|bookmarks| !bookmarks.is_empty()) else {
        return scenes.to_vec();
    };

    let target_id = main_scene_id(scenes);
    let fallback_index = match target_id {
        Some(_) => None,
        None => scenes.iter().position(Value::is_object),
    };

    scenes
        .iter()
        .enumerate()
        .map(|(index, scene)| {
            let Some(record) = scene.as_object() else {
                return scene.clone();
            };

            let is_target = match target_id {
                Some(id) => optional_string(record.get("id")) == Some(id),
                None => fallback_index == Some(index),
            };
            let has_own_bookmarks =
                array_value(record.get("bookmarks")).is_some_and(|bookmarks| !bookmarks.is_empty());
            if !is_target || has_own_bookmarks {
                return scene.clone();
            }

            Value::Object(merge_fields(
                record,
                [("bookmarks", Value::Array(legacy.clone()))],
            ))
        })
        .collect()
}

fn current_scene_id(value: Option<&Value>, scenes: &[Value]) -> String {
    optional_string(value)
        .filter(|id| !id.is_empty())
        .or_else(|| main_scene_id(scenes))
        .unwrap_or_default()
        .to_string()
}
