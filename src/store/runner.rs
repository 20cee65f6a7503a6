//! Store-bound migration.
//!
//! Reads every stored value once, migrates each object in memory, and writes
//! back only records that changed and carry a resolvable id. Documents are
//! independent: a value that is not an object, a record without an id, or a
//! failed write never stops its siblings from being processed.

use super::ProjectStore;
use crate::config::MigrationConfig;
use crate::core::Result;
use crate::document::{ProjectDocument, ProjectRecord, detect_version};
use crate::migrations::{MigrationPlan, MigrationStep, SkipReason, Terminal};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tracing::{Instrument, Level, event, info_span};

/// What happened to one stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentOutcome {
    Written,
    /// Would have been written, but the run was a dry run.
    WouldWrite,
    Unchanged,
    /// No id could be resolved; left as-is in storage.
    Unidentified,
    WriteFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentReport {
    pub project_id: Option<String>,
    pub from_version: u32,
    pub to_version: u32,
    pub steps_applied: usize,
    pub outcome: DocumentOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationSummary {
    pub scanned: usize,
    pub written: usize,
    pub would_write: usize,
    pub unchanged: usize,
    pub unidentified: usize,
    pub non_object: usize,
    pub write_failures: usize,
    pub reports: Vec<DocumentReport>,
}

impl MigrationSummary {
    fn push(&mut self, report: DocumentReport) -> usize {
        match report.outcome {
            DocumentOutcome::Written => {}
            DocumentOutcome::WouldWrite => self.would_write += 1,
            DocumentOutcome::Unchanged => self.unchanged += 1,
            DocumentOutcome::Unidentified => self.unidentified += 1,
            DocumentOutcome::WriteFailed(_) => self.write_failures += 1,
        }
        self.reports.push(report);
        self.reports.len() - 1
    }

    pub fn has_failures(&self) -> bool {
        self.write_failures > 0
    }
}

/// A record waiting to be written: its report slot, key and value.
type PendingWrite = (usize, String, Value);

/// Runs a full [`MigrationPlan`] over a store.
#[derive(Debug, Clone)]
pub struct MigrationRunner {
    plan: MigrationPlan,
    config: MigrationConfig,
}

impl MigrationRunner {
    pub fn new(plan: MigrationPlan, config: MigrationConfig) -> Self {
        Self { plan, config }
    }

    pub fn plan(&self) -> &MigrationPlan {
        &self.plan
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Migrates every stored project to the plan's target version.
    ///
    /// Safe to re-run at any time: already-current records are left
    /// untouched and not rewritten.
    ///
    /// ```
    /// # tokio_test::block_on(async {
    /// use reeldb::{
    ///     InMemoryProjectStore, MigrationConfig, MigrationRunner, TransformOptions,
    ///     project_migration_plan,
    /// };
    /// use serde_json::json;
    ///
    /// let store = InMemoryProjectStore::with_documents([("p-1", json!({"id": "p-1"}))]);
    /// let runner = MigrationRunner::new(
    ///     project_migration_plan(TransformOptions::default()),
    ///     MigrationConfig::default(),
    /// );
    ///
    /// let summary = runner.run(&store).await.unwrap();
    /// assert_eq!(summary.written, 1);
    /// assert_eq!(store.get("p-1").await.unwrap()["version"], json!(3));
    /// # });
    /// ```
    pub async fn run<S>(&self, store: &S) -> Result<MigrationSummary>
    where
        S: ProjectStore + ?Sized,
    {
        self.plan.validate()?;

        let span = info_span!(
            "migration.batch",
            target_version = self.plan.current_version(),
            dry_run = self.config.dry_run
        );

        self.run_batch(store).instrument(span).await
    }

    async fn run_batch<S>(&self, store: &S) -> Result<MigrationSummary>
    where
        S: ProjectStore + ?Sized,
    {
        let documents = store.get_all().await?;
        let mut summary = MigrationSummary::default();
        let mut pending = Vec::new();

        for value in documents {
            summary.scanned += 1;
            let Value::Object(record) = value else {
                summary.non_object += 1;
                event!(Level::DEBUG, "skipping non-object document");
                continue;
            };

            if let Some(write) = self.migrate_one(&record, &mut summary) {
                pending.push(write);
            }
        }

        write_back(store, pending, &self.config, &mut summary).await?;
        log_summary(&summary);
        Ok(summary)
    }

    fn migrate_one(
        &self,
        record: &ProjectRecord,
        summary: &mut MigrationSummary,
    ) -> Option<PendingWrite> {
        let migration = self.plan.migrate_document(record);
        let span = info_span!(
            "migration.document",
            project_id = migration.project_id.as_deref().unwrap_or("<none>"),
            from = migration.from_version,
            to = migration.to_version
        );
        let _enter = span.enter();

        if let Terminal::NoStepFor(version) = migration.terminal {
            event!(Level::WARN, version, "no migration registered for schema version");
        }

        let outcome = match (&migration.project_id, migration.needs_write()) {
            (None, _) => {
                event!(Level::DEBUG, "project has no resolvable id; leaving as-is");
                DocumentOutcome::Unidentified
            }
            (Some(_), false) => DocumentOutcome::Unchanged,
            (Some(_), true) if self.config.dry_run => DocumentOutcome::WouldWrite,
            (Some(_), true) => DocumentOutcome::Written,
        };

        let report = DocumentReport {
            project_id: migration.project_id.clone(),
            from_version: migration.from_version,
            to_version: migration.to_version,
            steps_applied: migration.steps_applied,
            outcome: outcome.clone(),
        };
        let slot = summary.push(report);

        match (outcome, migration.project_id) {
            (DocumentOutcome::Written, Some(id)) => {
                Some((slot, id, Value::Object(migration.document.into_owned())))
            }
            _ => None,
        }
    }

    /// Reads every stored project and returns the ones that are, or can be
    /// brought in memory to, the current version. Nothing is written.
    pub async fn load_current_projects<S>(&self, store: &S) -> Result<Vec<ProjectDocument>>
    where
        S: ProjectStore + ?Sized,
    {
        self.plan.validate()?;

        let mut projects = Vec::new();
        for value in store.get_all().await? {
            let Value::Object(record) = value else {
                continue;
            };

            let migration = self.plan.migrate_document(&record);
            if migration.to_version != self.plan.current_version()
                || migration.project_id.is_none()
            {
                event!(
                    Level::DEBUG,
                    version = migration.to_version,
                    "skipping project that cannot reach the current version"
                );
                continue;
            }

            match ProjectDocument::from_record(&migration.document) {
                Ok(project) => projects.push(project),
                Err(err) => {
                    event!(Level::WARN, error = %err, "current project failed to decode");
                }
            }
        }

        Ok(projects)
    }
}

/// Applies a single step to every stored project, the way a standalone
/// `from -> to` migration would. Skipped and unidentifiable records are not
/// written.
pub async fn run_step<S>(
    store: &S,
    step: &MigrationStep,
    config: &MigrationConfig,
) -> Result<MigrationSummary>
where
    S: ProjectStore + ?Sized,
{
    let span = info_span!(
        "migration.step",
        from = step.from_version,
        to = step.to_version,
        dry_run = config.dry_run
    );

    run_step_batch(store, step, config).instrument(span).await
}

async fn run_step_batch<S>(
    store: &S,
    step: &MigrationStep,
    config: &MigrationConfig,
) -> Result<MigrationSummary>
where
    S: ProjectStore + ?Sized,
{
    let documents = store.get_all().await?;
    let mut summary = MigrationSummary::default();
    let mut pending = Vec::new();

    for value in documents {
        summary.scanned += 1;
        let Value::Object(record) = value else {
            summary.non_object += 1;
            continue;
        };

        let from_version = detect_version(&record);
        let outcome = step.apply(&record);
        if outcome.skipped {
            let outcome = match outcome.reason {
                Some(SkipReason::NoProjectId) => DocumentOutcome::Unidentified,
                _ => DocumentOutcome::Unchanged,
            };
            summary.push(DocumentReport {
                project_id: step.project_id(&record),
                from_version,
                to_version: from_version,
                steps_applied: 0,
                outcome,
            });
            continue;
        }

        let migrated = outcome.into_document();
        let project_id = step.project_id(&migrated);
        let outcome = match &project_id {
            None => DocumentOutcome::Unidentified,
            Some(_) if config.dry_run => DocumentOutcome::WouldWrite,
            Some(_) => DocumentOutcome::Written,
        };
        let slot = summary.push(DocumentReport {
            project_id: project_id.clone(),
            from_version,
            to_version: detect_version(&migrated),
            steps_applied: 1,
            outcome: outcome.clone(),
        });

        if let (DocumentOutcome::Written, Some(id)) = (outcome, project_id) {
            pending.push((slot, id, Value::Object(migrated)));
        }
    }

    write_back(store, pending, config, &mut summary).await?;
    log_summary(&summary);
    Ok(summary)
}

/// Writes pending records with bounded concurrency. Writes are independent
/// and unordered; a failure is recorded on its report unless the config asks
/// to stop.
async fn write_back<S>(
    store: &S,
    pending: Vec<PendingWrite>,
    config: &MigrationConfig,
    summary: &mut MigrationSummary,
) -> Result<()>
where
    S: ProjectStore + ?Sized,
{
    let writes = stream::iter(pending)
        .map(|(slot, id, document)| async move {
            let result = store.set(&id, document).await;
            (slot, id, result)
        })
        .buffer_unordered(config.write_concurrency.max(1));
    let mut writes = std::pin::pin!(writes);

    while let Some((slot, id, result)) = writes.next().await {
        match result {
            Ok(()) => {
                summary.written += 1;
                event!(Level::DEBUG, project_id = %id, "project written");
            }
            Err(err) => {
                event!(Level::ERROR, project_id = %id, error = %err, "project write-back failed");
                if config.stop_on_write_error {
                    return Err(err);
                }
                summary.write_failures += 1;
                if let Some(report) = summary.reports.get_mut(slot) {
                    report.outcome = DocumentOutcome::WriteFailed(err.to_string());
                }
            }
        }
    }

    Ok(())
}

fn log_summary(summary: &MigrationSummary) {
    event!(
        Level::INFO,
        scanned = summary.scanned,
        written = summary.written,
        would_write = summary.would_write,
        unchanged = summary.unchanged,
        unidentified = summary.unidentified,
        non_object = summary.non_object,
        write_failures = summary.write_failures,
        "migration batch finished"
    );
}
