//! Typed view of a current-generation project.
//!
//! These shapes are only decoded from records that have already been
//! migrated forward. Unknown fields on tracks and elements are kept in
//! `extra` so decoding and re-encoding does not drop element payloads.

use super::ProjectRecord;
use super::coerce::{
    PROJECT_ID_LOCATIONS, array_value, number_value, optional_string, record_value, resolve_id,
    string_value,
};
use super::version::{CURRENT_PROJECT_VERSION, detect_version};
use crate::core::{MigrateError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_FPS: f64 = 30.0;
pub const DEFAULT_CANVAS_SIZE: CanvasSize = CanvasSize {
    width: 1920.0,
    height: 1080.0,
};
pub const DEFAULT_BACKGROUND_COLOR: &str = "#000000";
pub const DEFAULT_BLUR_INTENSITY: f64 = 8.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocument {
    pub version: u32,
    pub metadata: ProjectMetadata,
    pub settings: ProjectSettings,
    #[serde(default)]
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub current_scene_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSettings {
    pub fps: f64,
    pub canvas_size: CanvasSize,
    pub background: Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

/// Project background, tagged by `type` on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Background {
    Color {
        color: String,
    },
    Blur {
        #[serde(rename = "blurIntensity")]
        blur_intensity: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_main: bool,
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub bookmarks: Vec<f64>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub elements: Vec<TimelineElement>,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub is_main: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineElement {
    pub id: String,
    #[serde(default)]
    pub start_time: f64,
    #[serde(default)]
    pub duration: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TimelineElement {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

impl Track {
    /// Latest element end time on this track, 0 when empty.
    pub fn duration(&self) -> f64 {
        self.elements
            .iter()
            .map(TimelineElement::end_time)
            .fold(0.0, f64::max)
    }
}

impl Scene {
    pub fn duration(&self) -> f64 {
        self.tracks.iter().map(Track::duration).fold(0.0, f64::max)
    }
}

impl ProjectDocument {
    /// Decodes a record whose detected generation is the current one.
    ///
    /// Decoding goes through the same coercion as the migrations, so a
    /// freshly migrated record always decodes: the id may live at the root
    /// or in `metadata`, missing settings take the named defaults, and
    /// tracks or elements without an id get one derived from their
    /// position.
    pub fn from_record(record: &ProjectRecord) -> Result<Self> {
        let Some(id) = resolve_id(record, PROJECT_ID_LOCATIONS) else {
            return Err(MigrateError::InvalidDocument(
                "Project has no resolvable id".to_string(),
            ));
        };

        let version = detect_version(record);
        if version != CURRENT_PROJECT_VERSION {
            return Err(MigrateError::InvalidDocument(format!(
                "Project '{}' is at schema version {}, expected {}",
                id, version, CURRENT_PROJECT_VERSION
            )));
        }

        let empty = Map::new();
        let metadata = record_value(record.get("metadata")).unwrap_or(&empty);
        let settings = record_value(record.get("settings")).unwrap_or(&empty);
        let scenes = array_value(record.get("scenes"))
            .map(|scenes| {
                scenes
                    .iter()
                    .filter_map(Value::as_object)
                    .enumerate()
                    .map(|(index, scene)| decode_scene(scene, index))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            version,
            metadata: ProjectMetadata {
                name: string_value(metadata.get("name"), "").to_string(),
                thumbnail: optional_string(metadata.get("thumbnail")).map(str::to_string),
                created_at: string_value(metadata.get("createdAt"), "").to_string(),
                updated_at: string_value(metadata.get("updatedAt"), "").to_string(),
                duration: number_value(metadata.get("duration"), 0.0),
                id,
            },
            settings: decode_settings(settings),
            scenes,
            current_scene_id: string_value(record.get("currentSceneId"), "").to_string(),
        })
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn main_scene(&self) -> Option<&Scene> {
        super::scenes::main_scene(&self.scenes)
    }

    pub fn current_scene(&self) -> Option<&Scene> {
        super::scenes::find_current_scene(&self.scenes, &self.current_scene_id)
    }
}

fn decode_settings(settings: &ProjectRecord) -> ProjectSettings {
    let canvas_size = match record_value(settings.get("canvasSize")) {
        Some(size) => CanvasSize {
            width: number_value(size.get("width"), DEFAULT_CANVAS_SIZE.width),
            height: number_value(size.get("height"), DEFAULT_CANVAS_SIZE.height),
        },
        None => DEFAULT_CANVAS_SIZE,
    };

    let background = record_value(settings.get("background"));
    let background = match background.and_then(|bg| optional_string(bg.get("type"))) {
        Some("blur") => Background::Blur {
            blur_intensity: number_value(
                background.and_then(|bg| bg.get("blurIntensity")),
                DEFAULT_BLUR_INTENSITY,
            ),
        },
        _ => Background::Color {
            color: string_value(
                background.and_then(|bg| bg.get("color")),
                DEFAULT_BACKGROUND_COLOR,
            )
            .to_string(),
        },
    };

    ProjectSettings {
        fps: number_value(settings.get("fps"), DEFAULT_FPS),
        canvas_size,
        background,
    }
}

fn decode_scene(scene: &ProjectRecord, index: usize) -> Scene {
    let id = owned_id(scene, || format!("scene-{index}"));
    let tracks = array_value(scene.get("tracks"))
        .map(|tracks| {
            tracks
                .iter()
                .filter_map(Value::as_object)
                .enumerate()
                .map(|(position, track)| decode_track(track, &id, position))
                .collect()
        })
        .unwrap_or_default();

    Scene {
        name: string_value(scene.get("name"), "").to_string(),
        is_main: scene.get("isMain").and_then(Value::as_bool).unwrap_or(false),
        tracks,
        bookmarks: array_value(scene.get("bookmarks"))
            .map(|marks| marks.iter().filter_map(Value::as_f64).collect())
            .unwrap_or_default(),
        created_at: string_value(scene.get("createdAt"), "").to_string(),
        updated_at: string_value(scene.get("updatedAt"), "").to_string(),
        id,
    }
}

const TRACK_FIELDS: &[&str] = &["id", "name", "type", "elements", "muted", "isMain"];
const ELEMENT_FIELDS: &[&str] = &["id", "startTime", "duration"];

fn decode_track(track: &ProjectRecord, scene_id: &str, position: usize) -> Track {
    let id = owned_id(track, || format!("{scene_id}-track-{position}"));
    let elements = array_value(track.get("elements"))
        .map(|elements| {
            elements
                .iter()
                .filter_map(Value::as_object)
                .enumerate()
                .map(|(index, element)| TimelineElement {
                    id: owned_id(element, || format!("{id}-element-{index}")),
                    start_time: number_value(element.get("startTime"), 0.0),
                    duration: number_value(element.get("duration"), 0.0),
                    extra: extra_fields(element, ELEMENT_FIELDS),
                })
                .collect()
        })
        .unwrap_or_default();

    Track {
        name: string_value(track.get("name"), "").to_string(),
        kind: string_value(track.get("type"), "").to_string(),
        elements,
        muted: track.get("muted").and_then(Value::as_bool).unwrap_or(false),
        is_main: track.get("isMain").and_then(Value::as_bool).unwrap_or(false),
        extra: extra_fields(track, TRACK_FIELDS),
        id,
    }
}

fn owned_id(record: &ProjectRecord, fallback: impl FnOnce() -> String) -> String {
    optional_string(record.get("id"))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(fallback)
}

fn extra_fields(record: &ProjectRecord, known: &[&str]) -> Map<String, Value> {
    record
        .iter()
        .filter(|(key, _)| !known.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
