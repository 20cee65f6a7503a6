//! Project documents as they sit in storage.
//!
//! A stored project is an open-ended JSON object whose shape depends on the
//! schema generation that last wrote it. Migration steps only ever see the
//! untyped [`ProjectRecord`] and coerce what they need field by field; the
//! typed [`model`] shapes describe the current generation and are used once
//! a record has been brought fully forward.
//!
//! - `coerce.rs` - typed extraction with fallbacks, shallow merge, id lookup
//! - `version.rs` - schema generation detection
//! - `model.rs` - typed current-generation document
//! - `scenes.rs` - scene/track construction and timeline duration

pub mod coerce;
pub mod model;
pub mod scenes;
pub mod version;

/// An untyped persisted project at any schema generation.
pub type ProjectRecord = serde_json::Map<String, serde_json::Value>;

pub use coerce::{
    IdLocation, PROJECT_ID_LOCATIONS, array_value, is_record, merge_fields, number_to_json,
    number_value, optional_string, record_value, resolve_id, string_value,
};
pub use model::{
    Background, CanvasSize, DEFAULT_BACKGROUND_COLOR, DEFAULT_BLUR_INTENSITY,
    DEFAULT_CANVAS_SIZE, DEFAULT_FPS, ProjectDocument, ProjectMetadata, ProjectSettings, Scene,
    TimelineElement, Track,
};
pub use version::{CURRENT_PROJECT_VERSION, declared_version, detect_version, inferred_version};
