//! Store-bound migration: write-back, isolation and dry runs

mod common;

use common::{CountingStore, FlakyStore, fixed_plan, v0_project, v1_project, v3_project};
use reeldb::{
    DocumentOutcome, InMemoryProjectStore, MigrateError, MigrationConfig, MigrationPlan,
    MigrationRunner, MigrationStep, ProjectStore, run_step,
};
use serde_json::{Value, json};

fn mixed_store() -> InMemoryProjectStore {
    InMemoryProjectStore::with_documents([
        ("a", v0_project("a")),
        ("b", v1_project("b")),
        ("c", v3_project("c")),
        ("garbage", json!("not a project")),
        ("orphan", json!({"name": "orphan"})),
    ])
}

fn runner(config: MigrationConfig) -> MigrationRunner {
    MigrationRunner::new(fixed_plan(), config)
}

#[tokio::test]
async fn test_run_migrates_and_writes_only_changed_projects() {
    let store = CountingStore::new(mixed_store());
    let summary = runner(MigrationConfig::default()).run(&store).await.unwrap();

    assert_eq!(summary.scanned, 5);
    assert_eq!(summary.written, 2);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.unidentified, 1);
    assert_eq!(summary.non_object, 1);
    assert!(!summary.has_failures());
    assert_eq!(store.writes(), 2);

    let a = store.inner.get("a").await.unwrap();
    assert_eq!(a["version"], json!(3));
    let b = store.inner.get("b").await.unwrap();
    assert_eq!(b["metadata"]["duration"], json!(15.5));
    assert_eq!(store.inner.get("c").await.unwrap(), v3_project("c"));
    assert_eq!(
        store.inner.get("orphan").await.unwrap(),
        json!({"name": "orphan"})
    );
    assert_eq!(
        store.inner.get("garbage").await.unwrap(),
        json!("not a project")
    );
}

#[tokio::test]
async fn test_second_run_writes_nothing() {
    let store = CountingStore::new(mixed_store());
    let runner = runner(MigrationConfig::default());
    runner.run(&store).await.unwrap();
    let first_writes = store.writes();

    let summary = runner.run(&store).await.unwrap();
    assert_eq!(summary.written, 0);
    assert_eq!(summary.unchanged, 3);
    assert_eq!(store.writes(), first_writes);
}

#[tokio::test]
async fn test_dry_run_never_writes() {
    let store = CountingStore::new(mixed_store());
    let summary = runner(MigrationConfig::new().dry_run(true))
        .run(&store)
        .await
        .unwrap();

    assert_eq!(summary.would_write, 2);
    assert_eq!(summary.written, 0);
    assert_eq!(store.writes(), 0);
    assert_eq!(store.inner.get("a").await.unwrap(), v0_project("a"));
}

#[tokio::test]
async fn test_failed_write_does_not_stop_siblings() {
    let store = FlakyStore::new(mixed_store(), &["a"]);
    let summary = runner(MigrationConfig::new().write_concurrency(1))
        .run(&store)
        .await
        .unwrap();

    assert_eq!(store.attempts(), 2);
    assert_eq!(summary.written, 1);
    assert_eq!(summary.write_failures, 1);
    assert!(summary.has_failures());

    let failed = summary
        .reports
        .iter()
        .find(|report| report.project_id.as_deref() == Some("a"))
        .unwrap();
    assert!(matches!(failed.outcome, DocumentOutcome::WriteFailed(_)));

    assert_eq!(store.inner.get("a").await.unwrap(), v0_project("a"));
    assert_eq!(store.inner.get("b").await.unwrap()["version"], json!(3));
}

#[tokio::test]
async fn test_stop_on_write_error_fails_the_batch() {
    let store = FlakyStore::new(mixed_store(), &["a", "b"]);
    let result = runner(MigrationConfig::new().stop_on_write_error(true))
        .run(&store)
        .await;

    assert!(matches!(result, Err(MigrateError::Store(_))));
}

#[tokio::test]
async fn test_invalid_plan_is_rejected_before_reading() {
    let step = MigrationStep::new(0, 2, |project| {
        reeldb::MigrationOutcome::migrated(project.clone())
    });
    let plan = MigrationPlan::from_steps(3, [step]);
    let store = CountingStore::new(mixed_store());

    let result = MigrationRunner::new(plan, MigrationConfig::default())
        .run(&store)
        .await;
    assert!(matches!(result, Err(MigrateError::InvalidPlan(_))));
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn test_run_step_applies_one_boundary() {
    let store = InMemoryProjectStore::with_documents([
        ("b", v1_project("b")),
        ("c", v3_project("c")),
    ]);
    let plan = fixed_plan();
    let step = plan.step_from(1).unwrap();

    let summary = run_step(&store, step, &MigrationConfig::default())
        .await
        .unwrap();
    assert_eq!(summary.written, 1);
    assert_eq!(summary.unchanged, 1);

    let b = store.get("b").await.unwrap();
    assert_eq!(b["version"], json!(2));
    assert!(b["metadata"].get("duration").is_none());
    assert_eq!(b["settings"]["fps"], json!(30));
    assert_eq!(store.get("c").await.unwrap(), v3_project("c"));
}

#[tokio::test]
async fn test_load_current_projects_migrates_in_memory_only() {
    let store = mixed_store();
    let projects = runner(MigrationConfig::default())
        .load_current_projects(&store)
        .await
        .unwrap();

    let ids: Vec<&str> = projects.iter().map(|project| project.id()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);

    let b = &projects[1];
    assert_eq!(b.metadata.duration, 15.5);
    assert_eq!(b.current_scene().map(|scene| scene.id.as_str()), Some("scene-main"));
    assert_eq!(b.main_scene().unwrap().bookmarks, vec![2.0, 4.5, 7.0]);

    let c = &projects[2];
    let element = &c.scenes[0].tracks[0].elements[0];
    assert_eq!(element.extra.get("src"), Some(&Value::from("clip.mp4")));

    assert_eq!(store.get("a").await.unwrap(), v0_project("a"));
}

#[tokio::test]
async fn test_store_trait_object_is_supported() {
    let store: Box<dyn ProjectStore> = Box::new(mixed_store());
    let summary = runner(MigrationConfig::default())
        .run(store.as_ref())
        .await
        .unwrap();
    assert_eq!(summary.written, 2);
}

#[tokio::test]
async fn test_load_current_projects_returns_every_project_reported_current() {
    let mut legacy = v1_project("legacy-elements");
    legacy["scenes"][0]["tracks"][0]["elements"] = json!([{"startTime": 0, "duration": 6}]);
    let mut stale = v3_project("stale");
    stale["version"] = json!(1);

    let store = InMemoryProjectStore::with_documents([
        ("root-id", json!({"id": "root-id", "version": 2, "scenes": []})),
        ("legacy-elements", legacy),
        ("stale", stale),
    ]);
    let runner = runner(MigrationConfig::new().dry_run(true));

    let summary = runner.run(&store).await.unwrap();
    assert!(summary.reports.iter().all(|report| report.to_version == 3));

    let projects = runner.load_current_projects(&store).await.unwrap();
    let ids: Vec<&str> = projects.iter().map(|project| project.id()).collect();
    assert_eq!(ids, vec!["legacy-elements", "root-id", "stale"]);

    let legacy = &projects[0];
    assert_eq!(legacy.metadata.duration, 6.0);
    assert!(!legacy.scenes[0].tracks[0].elements[0].id.is_empty());

    let root_only = &projects[1];
    assert_eq!(root_only.settings.fps, 30.0);
    assert_eq!(root_only.metadata.duration, 0.0);

    assert_eq!(projects[2].metadata.duration, 4.0);
}

#[tokio::test]
async fn test_run_step_counts_records_without_id() {
    let mut orphan = v1_project("ignored");
    orphan.as_object_mut().unwrap().remove("id");
    let store = InMemoryProjectStore::with_documents([
        ("b", v1_project("b")),
        ("orphan", orphan.clone()),
    ]);
    let plan = fixed_plan();

    let summary = run_step(&store, plan.step_from(1).unwrap(), &MigrationConfig::default())
        .await
        .unwrap();
    assert_eq!(summary.written, 1);
    assert_eq!(summary.unidentified, 1);
    assert_eq!(summary.unchanged, 0);
    assert_eq!(store.get("orphan").await.unwrap(), orphan);
}
