//! Keyed project stores.
//!
//! The migration engine only needs two operations from a backend: read every
//! stored value, and write one value under a project id. Anything that can
//! do both asynchronously can be migrated.

use crate::core::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

mod directory;
pub mod runner;

pub use directory::JsonDirectoryStore;
pub use runner::{DocumentOutcome, DocumentReport, MigrationRunner, MigrationSummary, run_step};

#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Every stored value, in no particular order. Values are untyped: a
    /// store may hold anything, including non-objects.
    async fn get_all(&self) -> Result<Vec<Value>>;

    /// Stores `value` under `id`, replacing any previous value.
    async fn set(&self, id: &str, value: Value) -> Result<()>;
}

/// A store held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryProjectStore {
    documents: Mutex<BTreeMap<String, Value>>,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents<I, K>(documents: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            documents: Mutex::new(
                documents
                    .into_iter()
                    .map(|(key, value)| (key.into(), value))
                    .collect(),
            ),
        }
    }

    pub async fn get(&self, id: &str) -> Option<Value> {
        self.documents.lock().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.documents.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.lock().await.is_empty()
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn get_all(&self) -> Result<Vec<Value>> {
        Ok(self.documents.lock().await.values().cloned().collect())
    }

    async fn set(&self, id: &str, value: Value) -> Result<()> {
        self.documents.lock().await.insert(id.to_string(), value);
        Ok(())
    }
}
