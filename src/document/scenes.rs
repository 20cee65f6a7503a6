//! Scene construction and timeline extent.
//!
//! Functions over `&[Value]` work on scenes straight out of an untyped
//! record; functions over `&[Scene]` work on decoded current documents.

use super::coerce::{array_value, number_value, record_value};
use super::model::Scene;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

pub const MAIN_SCENE_NAME: &str = "Main scene";
pub const MAIN_TRACK_NAME: &str = "Main Track";

/// Formats a timestamp the way stored documents carry them,
/// e.g. `2024-06-01T12:00:00.000Z`.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// The single main video track every fresh scene starts with.
pub fn default_track_value() -> Value {
    json!({
        "id": new_id(),
        "name": MAIN_TRACK_NAME,
        "type": "video",
        "elements": [],
        "muted": false,
        "isMain": true,
    })
}

/// A fresh scene with one main track and no bookmarks.
pub fn default_scene_value(name: &str, is_main: bool, now: DateTime<Utc>) -> Value {
    let timestamp = iso_timestamp(now);
    json!({
        "id": new_id(),
        "name": name,
        "isMain": is_main,
        "tracks": [default_track_value()],
        "bookmarks": [],
        "createdAt": timestamp,
        "updatedAt": timestamp,
    })
}

fn is_flagged_main(scene: &Value) -> bool {
    scene.get("isMain").and_then(Value::as_bool) == Some(true)
}

/// Id of the scene flagged main, falling back to the first scene with a
/// string id.
pub fn main_scene_id(scenes: &[Value]) -> Option<&str> {
    let with_id = |scene: &&Value| scene.is_object() && scene.get("id").is_some_and(Value::is_string);

    scenes
        .iter()
        .filter(with_id)
        .find(|scene| is_flagged_main(scene))
        .or_else(|| scenes.iter().find(with_id))
        .and_then(|scene| scene.get("id"))
        .and_then(Value::as_str)
}

/// The record scene whose layout represents the project: flagged main,
/// else the first record scene.
pub fn main_scene_value(scenes: &[Value]) -> Option<&Value> {
    scenes
        .iter()
        .filter(|scene| scene.is_object())
        .find(|scene| is_flagged_main(scene))
        .or_else(|| scenes.iter().find(|scene| scene.is_object()))
}

/// Latest `startTime + duration` over every element of every track.
/// Malformed tracks and elements contribute nothing.
pub fn tracks_duration(tracks: &[Value]) -> f64 {
    tracks
        .iter()
        .filter_map(|track| array_value(track.get("elements")))
        .flat_map(|elements| elements.iter())
        .filter_map(|element| element.as_object())
        .map(|element| {
            number_value(element.get("startTime"), 0.0) + number_value(element.get("duration"), 0.0)
        })
        .fold(0.0, f64::max)
}

/// Duration of the main scene only; sibling scenes never contribute.
pub fn project_duration_from_scenes(scenes: &[Value]) -> f64 {
    main_scene_value(scenes)
        .and_then(|scene| record_value(Some(scene)))
        .and_then(|scene| array_value(scene.get("tracks")))
        .map(|tracks| tracks_duration(tracks))
        .unwrap_or(0.0)
}

pub fn main_scene(scenes: &[Scene]) -> Option<&Scene> {
    scenes.iter().find(|scene| scene.is_main)
}

/// The scene with `current_scene_id`, else the main scene, else the first.
pub fn find_current_scene<'a>(scenes: &'a [Scene], current_scene_id: &str) -> Option<&'a Scene> {
    scenes
        .iter()
        .find(|scene| scene.id == current_scene_id)
        .or_else(|| main_scene(scenes))
        .or_else(|| scenes.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_iso_timestamp_has_millis_and_zulu() {
        assert_eq!(iso_timestamp(fixed_now()), "2024-06-01T12:00:00.000Z");
    }

    #[test]
    fn test_default_scene_shape() {
        let scene = default_scene_value(MAIN_SCENE_NAME, true, fixed_now());
        assert_eq!(scene["isMain"], json!(true));
        assert_eq!(scene["name"], json!("Main scene"));
        assert_eq!(scene["bookmarks"], json!([]));
        assert_eq!(scene["createdAt"], json!("2024-06-01T12:00:00.000Z"));
        let tracks = scene["tracks"].as_array().unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0]["isMain"], json!(true));
        assert_eq!(tracks[0]["type"], json!("video"));
    }

    #[test]
    fn test_main_scene_id_prefers_flag_then_first_with_id() {
        let flagged = vec![json!({"id": "a"}), json!({"id": "b", "isMain": true})];
        assert_eq!(main_scene_id(&flagged), Some("b"));

        let unflagged = vec![json!("junk"), json!({"name": "no id"}), json!({"id": "c"})];
        assert_eq!(main_scene_id(&unflagged), Some("c"));

        assert_eq!(main_scene_id(&[json!({"isMain": true})]), None);
    }

    #[test]
    fn test_duration_is_latest_end_not_sum() {
        let scenes = vec![json!({
            "id": "main",
            "isMain": true,
            "tracks": [
                {"elements": [{"startTime": 0, "duration": 15.5}]},
                {"elements": [{"startTime": 2, "duration": 5}]}
            ]
        })];
        assert_eq!(project_duration_from_scenes(&scenes), 15.5);
    }

    #[test]
    fn test_duration_ignores_sibling_scenes() {
        let scenes = vec![
            json!({"id": "other", "tracks": [{"elements": [{"startTime": 0, "duration": 99}]}]}),
            json!({"id": "main", "isMain": true, "tracks": [{"elements": [{"startTime": 1, "duration": 2}]}]}),
        ];
        assert_eq!(project_duration_from_scenes(&scenes), 3.0);
    }

    #[test]
    fn test_duration_tolerates_missing_tracks() {
        assert_eq!(project_duration_from_scenes(&[]), 0.0);
        assert_eq!(project_duration_from_scenes(&[json!({"id": "main", "isMain": true})]), 0.0);
        let scenes = vec![json!({"isMain": true, "tracks": [null, {"elements": "bad"}, {"elements": [7]}]})];
        assert_eq!(project_duration_from_scenes(&scenes), 0.0);
    }
}
