use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use reeldb::{
    DocumentOutcome, JsonDirectoryStore, MigrationConfig, MigrationRunner, MigrationSummary,
    ProjectStore, TransformOptions, detect_version, project_migration_plan,
};
use serde_json::Value;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reeldb")]
#[command(about = "Project document store and schema migration tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Bring every project in a store directory to the current schema
    Migrate {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long)]
        dry_run: bool,
        #[arg(long, default_value_t = 8)]
        concurrency: usize,
        #[arg(long)]
        stop_on_error: bool,
        /// Print the summary as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show the detected schema version of every stored project
    Inspect {
        #[arg(long)]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Migrate {
            dir,
            dry_run,
            concurrency,
            stop_on_error,
            json,
        } => {
            let config = MigrationConfig::new()
                .write_concurrency(concurrency)
                .dry_run(dry_run)
                .stop_on_write_error(stop_on_error);
            migrate(dir, config, json).await
        }
        Command::Inspect { dir } => inspect(dir).await,
    }
}

async fn migrate(dir: PathBuf, config: MigrationConfig, json: bool) -> Result<()> {
    let store = JsonDirectoryStore::open(&dir)
        .await
        .with_context(|| format!("Failed to open store '{}'", dir.display()))?;
    let runner = MigrationRunner::new(project_migration_plan(TransformOptions::default()), config);

    let summary = runner
        .run(&store)
        .await
        .with_context(|| format!("Migration of '{}' aborted", dir.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    if summary.has_failures() {
        bail!("{} project(s) failed to write back", summary.write_failures);
    }
    Ok(())
}

async fn inspect(dir: PathBuf) -> Result<()> {
    let store = JsonDirectoryStore::open(&dir)
        .await
        .with_context(|| format!("Failed to open store '{}'", dir.display()))?;
    let plan = project_migration_plan(TransformOptions::default());

    for value in store.get_all().await? {
        let Value::Object(record) = value else {
            println!("{:<40} {:>8}", "<non-object>", "-");
            continue;
        };
        let migration = plan.migrate_document(&record);
        println!(
            "{:<40} {:>8} -> {}",
            migration.project_id.as_deref().unwrap_or("<no id>"),
            detect_version(&record),
            migration.to_version
        );
    }
    Ok(())
}

fn print_summary(summary: &MigrationSummary) {
    for report in &summary.reports {
        let outcome = match &report.outcome {
            DocumentOutcome::Written => "written".to_string(),
            DocumentOutcome::WouldWrite => "would write".to_string(),
            DocumentOutcome::Unchanged => "unchanged".to_string(),
            DocumentOutcome::Unidentified => "no id".to_string(),
            DocumentOutcome::WriteFailed(err) => format!("failed: {}", err),
        };
        println!(
            "{:<40} v{} -> v{}  {}",
            report.project_id.as_deref().unwrap_or("<no id>"),
            report.from_version,
            report.to_version,
            outcome
        );
    }

    println!(
        "scanned {}, written {}, would write {}, unchanged {}, no id {}, non-object {}, failed {}",
        summary.scanned,
        summary.written,
        summary.would_write,
        summary.unchanged,
        summary.unidentified,
        summary.non_object,
        summary.write_failures
    );
}
