// ============================================================================
// ReelDB Library
// ============================================================================

//! Local store for video-editor project documents, with forward-only,
//! idempotent schema migrations.
//!
//! Stored projects are untyped JSON records that may sit at any historical
//! schema generation (0 to [`CURRENT_PROJECT_VERSION`]). A
//! [`MigrationPlan`] walks one record through the registered transformers
//! until it reaches a fixed point; a [`MigrationRunner`] does the same for
//! every record in a [`ProjectStore`] and writes back only what changed.
//!
//! ```
//! use reeldb::{TransformOptions, project_migration_plan};
//! use serde_json::json;
//!
//! let plan = project_migration_plan(TransformOptions::default());
//! let record = json!({"id": "p-1", "name": "Trailer", "fps": 24});
//! let migrated = plan.migrate_record(record.as_object().unwrap());
//!
//! assert_eq!(migrated["version"], json!(3));
//! assert_eq!(migrated["settings"]["fps"], json!(24));
//! ```

pub mod config;
pub mod core;
pub mod document;
pub mod migrations;
pub mod store;

// Re-export main types for convenience
pub use config::MigrationConfig;
pub use core::{MigrateError, Result};
pub use document::{CURRENT_PROJECT_VERSION, ProjectDocument, ProjectRecord, detect_version};
pub use migrations::{
    DocumentMigration, MigrationOutcome, MigrationPlan, MigrationStep, SkipReason, Terminal,
    TransformOptions, project_migration_plan, transform_v0_to_v1, transform_v1_to_v2,
    transform_v2_to_v3,
};
pub use store::{
    DocumentOutcome, DocumentReport, InMemoryProjectStore, JsonDirectoryStore, MigrationRunner,
    MigrationSummary, ProjectStore, run_step,
};
