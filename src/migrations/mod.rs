//! Forward-only project schema migrations.
//!
//! Each `vN_to_vM` module holds one pure transformer that both detects
//! whether a record already sits at or past its target generation and
//! performs the upgrade when it does not. [`MigrationPlan`] chains them and
//! walks a single record to its fixed point; the store-bound side lives in
//! [`crate::store::runner`].

use crate::document::ProjectRecord;
use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::fmt;

mod plan;
pub mod v0_to_v1;
pub mod v1_to_v2;
pub mod v2_to_v3;

pub use plan::{DocumentMigration, MigrationPlan, MigrationStep, ProjectIdFn, Terminal, TransformFn};
pub use v0_to_v1::transform_v0_to_v1;
pub use v1_to_v2::{transform_v1_to_v2, transform_v1_to_v2_with};
pub use v2_to_v3::transform_v2_to_v3;

/// Why a transformer declined to touch a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    AlreadyHasScenes,
    AlreadyV2,
    AlreadyV3,
    NoProjectId,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::AlreadyHasScenes => "already has scenes",
            SkipReason::AlreadyV2 => "already v2",
            SkipReason::AlreadyV3 => "already v3",
            SkipReason::NoProjectId => "no project id",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one transformer call.
///
/// A skipped outcome borrows the input record untouched; a migrated outcome
/// owns a freshly built record. The input is never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationOutcome<'a> {
    pub document: Cow<'a, ProjectRecord>,
    pub skipped: bool,
    pub reason: Option<SkipReason>,
}

impl<'a> MigrationOutcome<'a> {
    pub fn migrated(document: ProjectRecord) -> Self {
        Self {
            document: Cow::Owned(document),
            skipped: false,
            reason: None,
        }
    }

    pub fn skipped(document: &'a ProjectRecord, reason: SkipReason) -> Self {
        Self {
            document: Cow::Borrowed(document),
            skipped: true,
            reason: Some(reason),
        }
    }

    pub fn into_document(self) -> ProjectRecord {
        self.document.into_owned()
    }
}

/// Knobs shared by transformers that stamp timestamps.
///
/// `now: None` reads the wall clock on every call; tests pin it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformOptions {
    pub now: Option<DateTime<Utc>>,
}

impl TransformOptions {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now: Some(now) }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }
}

/// The project chain `0 -> 1 -> 2 -> 3`.
pub fn project_migration_plan(options: TransformOptions) -> MigrationPlan {
    let steps = [
        MigrationStep::new(0, 1, move |project| {
            v0_to_v1::transform_v0_to_v1(project, &options)
        })
        .with_project_id(v0_to_v1::project_id),
        MigrationStep::new(1, 2, move |project| {
            v1_to_v2::transform_v1_to_v2_with(project, &options)
        })
        .with_project_id(v1_to_v2::project_id),
        MigrationStep::new(2, 3, v2_to_v3::transform_v2_to_v3).with_project_id(v2_to_v3::project_id),
    ];

    MigrationPlan::from_steps(crate::document::CURRENT_PROJECT_VERSION, steps)
}
