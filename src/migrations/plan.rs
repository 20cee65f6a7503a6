use super::{MigrationOutcome, SkipReason};
use crate::core::{MigrateError, Result};
use crate::document::{PROJECT_ID_LOCATIONS, ProjectRecord, detect_version, resolve_id};
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{Level, event};

/// A pure upgrade of one record across one version boundary.
pub type TransformFn = Arc<dyn Fn(&ProjectRecord) -> MigrationOutcome<'_> + Send + Sync>;

/// Locates the project id for the generation a step produces.
pub type ProjectIdFn = fn(&ProjectRecord) -> Option<String>;

fn default_project_id(record: &ProjectRecord) -> Option<String> {
    resolve_id(record, PROJECT_ID_LOCATIONS)
}

/// One registered `from -> to` transformer.
#[derive(Clone)]
pub struct MigrationStep {
    pub from_version: u32,
    pub to_version: u32,
    pub(crate) transform: TransformFn,
    pub(crate) project_id: ProjectIdFn,
}

/// Ordered, contiguous chain of steps up to `current_version`.
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    pub(crate) current_version: u32,
    pub(crate) steps: Vec<MigrationStep>,
}

/// Why the chain stopped for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    /// Detected generation reached the plan's current version.
    UpToDate,
    /// Nothing registered starts at this generation.
    NoStepFor(u32),
    /// The matching transformer declined the record.
    Skipped(Option<SkipReason>),
}

/// The fixed point of running a record through a plan.
#[derive(Debug, Clone)]
pub struct DocumentMigration<'a> {
    pub document: Cow<'a, ProjectRecord>,
    pub project_id: Option<String>,
    pub from_version: u32,
    pub to_version: u32,
    pub steps_applied: usize,
    pub terminal: Terminal,
    pub changed: bool,
}

impl DocumentMigration<'_> {
    /// Only changed records with a resolvable id are ever written back.
    pub fn needs_write(&self) -> bool {
        self.changed && self.project_id.is_some()
    }
}

// Split by concern, mirroring the step/plan/execution layering.
include!("plan/step_builder.rs");
include!("plan/validation.rs");
include!("plan/execution.rs");
