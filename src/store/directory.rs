//! One JSON file per project under a root directory.

use super::ProjectStore;
use crate::core::{MigrateError, Result};
use crate::document::{PROJECT_ID_LOCATIONS, resolve_id};
use async_trait::async_trait;
use log::warn;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;

const DOCUMENT_EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct JsonDirectoryStore {
    root: PathBuf,
}

impl JsonDirectoryStore {
    /// Opens (and creates if needed) a store rooted at `root`.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await.map_err(|err| {
            MigrateError::Io(format!(
                "Failed to create store directory '{}': {}",
                root.display(),
                err
            ))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing project `id`.
    pub fn document_path(&self, id: &str) -> Result<PathBuf> {
        validate_document_id(id)?;
        Ok(self.root.join(format!("{id}.{DOCUMENT_EXTENSION}")))
    }

    pub async fn get(&self, id: &str) -> Result<Option<Value>> {
        let path = self.document_path(id)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(MigrateError::Io(format!(
                "Failed to read '{}': {}",
                path.display(),
                err
            ))),
        }
    }
}

/// Ids become file names, so anything that could escape the root or hide
/// the file is rejected.
fn validate_document_id(id: &str) -> Result<()> {
    if id.is_empty()
        || id.starts_with('.')
        || id.contains(['/', '\\', '\0'])
    {
        return Err(MigrateError::Store(format!(
            "Project id '{}' cannot be used as a file name",
            id
        )));
    }
    Ok(())
}

#[async_trait]
impl ProjectStore for JsonDirectoryStore {
    async fn get_all(&self) -> Result<Vec<Value>> {
        let mut entries = fs::read_dir(&self.root).await.map_err(|err| {
            MigrateError::Io(format!(
                "Failed to list store directory '{}': {}",
                self.root.display(),
                err
            ))
        })?;

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some(DOCUMENT_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = match fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!("skipping unreadable project file '{}': {}", path.display(), err);
                    continue;
                }
            };
            let document = match serde_json::from_slice::<Value>(&bytes) {
                Ok(document) => document,
                Err(err) => {
                    warn!("skipping malformed project file '{}': {}", path.display(), err);
                    continue;
                }
            };
            if let Some(id) = misplaced_id(&path, &document) {
                warn!(
                    "skipping project file '{}': it holds project '{}', which belongs in '{}.{}'",
                    path.display(),
                    id,
                    id,
                    DOCUMENT_EXTENSION
                );
                continue;
            }
            documents.push(document);
        }

        Ok(documents)
    }

    async fn set(&self, id: &str, value: Value) -> Result<()> {
        let path = self.document_path(id)?;
        let bytes = serde_json::to_vec_pretty(&value)?;
        atomic_write(&self.root, &path, bytes).await
    }
}

/// The id a document resolves to when it differs from its file stem.
/// Write-back always targets `<id>.json`, so such a file could never be
/// migrated in place.
fn misplaced_id(path: &Path, document: &Value) -> Option<String> {
    let id = resolve_id(document.as_object()?, PROJECT_ID_LOCATIONS)?;
    let stem = path.file_stem().and_then(|stem| stem.to_str());
    (stem != Some(id.as_str())).then_some(id)
}

/// Writes through a uniquely named temp file in the same directory, then
/// renames it over `path`.
async fn atomic_write(root: &Path, path: &Path, bytes: Vec<u8>) -> Result<()> {
    let root = root.to_path_buf();
    let path = path.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut tmp = NamedTempFile::new_in(&root).map_err(|err| {
            MigrateError::Io(format!(
                "Failed to create temp file in '{}': {}",
                root.display(),
                err
            ))
        })?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|err| {
            MigrateError::Io(format!(
                "Failed to move temp file into '{}': {}",
                path.display(),
                err.error
            ))
        })?;
        Ok(())
    })
    .await
    .map_err(|err| MigrateError::Io(format!("Write task failed: {}", err)))?
}
