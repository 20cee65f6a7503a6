#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reeldb::{
    InMemoryProjectStore, MigrateError, MigrationPlan, ProjectRecord, ProjectStore, Result,
    TransformOptions, project_migration_plan,
};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn record(value: Value) -> ProjectRecord {
    value.as_object().cloned().unwrap()
}

pub fn fixed_options() -> TransformOptions {
    TransformOptions::at(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
}

pub fn fixed_plan() -> MigrationPlan {
    project_migration_plan(fixed_options())
}

pub fn v0_project(id: &str) -> Value {
    json!({
        "id": id,
        "name": "My V0 Project",
        "fps": 24,
        "canvasSize": {"width": 1280, "height": 720},
        "backgroundType": "blur",
        "blurIntensity": 12,
        "bookmarks": [1.5, 3],
        "createdAt": "2024-01-01T00:00:00.000Z",
        "updatedAt": "2024-01-01T00:00:00.000Z"
    })
}

pub fn v1_project(id: &str) -> Value {
    json!({
        "id": id,
        "version": 1,
        "name": "My V1 Project",
        "createdAt": "2024-01-15T10:00:00.000Z",
        "updatedAt": "2024-01-15T12:00:00.000Z",
        "fps": 30,
        "canvasSize": {"width": 1920, "height": 1080},
        "backgroundColor": "#1a1a1a",
        "backgroundType": "color",
        "currentSceneId": "scene-main",
        "bookmarks": [2, 4.5, 7],
        "scenes": [{
            "id": "scene-main",
            "name": "Main scene",
            "isMain": true,
            "tracks": [{
                "id": "track-1",
                "name": "Main Track",
                "type": "video",
                "isMain": true,
                "muted": false,
                "elements": [
                    {"id": "e-1", "startTime": 0, "duration": 10},
                    {"id": "e-2", "startTime": 10, "duration": 5.5}
                ]
            }],
            "bookmarks": []
        }]
    })
}

pub fn v3_project(id: &str) -> Value {
    json!({
        "version": 3,
        "metadata": {
            "id": id,
            "name": "Current",
            "createdAt": "2024-02-01T00:00:00.000Z",
            "updatedAt": "2024-02-01T00:00:00.000Z",
            "duration": 4
        },
        "settings": {
            "fps": 30,
            "canvasSize": {"width": 1920, "height": 1080},
            "background": {"type": "color", "color": "#000000"}
        },
        "scenes": [{
            "id": "s-1",
            "name": "Main scene",
            "isMain": true,
            "tracks": [{
                "id": "t-1",
                "name": "Main Track",
                "type": "video",
                "isMain": true,
                "muted": false,
                "elements": [{"id": "e-1", "startTime": 1, "duration": 3, "src": "clip.mp4"}]
            }],
            "bookmarks": [2]
        }],
        "currentSceneId": "s-1"
    })
}

/// Wraps an in-memory store, failing every write to the listed ids.
pub struct FlakyStore {
    pub inner: InMemoryProjectStore,
    pub failing: HashSet<String>,
    pub attempts: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: InMemoryProjectStore, failing: &[&str]) -> Self {
        Self {
            inner,
            failing: failing.iter().map(|id| id.to_string()).collect(),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProjectStore for FlakyStore {
    async fn get_all(&self) -> Result<Vec<Value>> {
        self.inner.get_all().await
    }

    async fn set(&self, id: &str, value: Value) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(id) {
            return Err(MigrateError::Store(format!("write to '{}' rejected", id)));
        }
        self.inner.set(id, value).await
    }
}

/// Counts writes without failing any.
pub struct CountingStore {
    pub inner: InMemoryProjectStore,
    pub writes: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: InMemoryProjectStore) -> Self {
        Self {
            inner,
            writes: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProjectStore for CountingStore {
    async fn get_all(&self) -> Result<Vec<Value>> {
        self.inner.get_all().await
    }

    async fn set(&self, id: &str, value: Value) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(id, value).await
    }
}
