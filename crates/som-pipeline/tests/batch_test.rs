//! Batch runs over the office fixture

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use som_pipeline::{
    BatchOrchestrator, CancellationFlag, CheckStage, Error, ExportFormat, FileStatus,
    ModelcheckConfig, ProgressSink, load_run_summary,
};
use som_validation::IssueKind;
use tempfile::TempDir;

fn testdata_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("testdata")
        .join(name)
}

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()
}

/// A model directory with the office model, a broken model and a text file
fn model_dir() -> anyhow::Result<TempDir> {
    let dir = TempDir::new()?;
    std::fs::copy(testdata_path("office.ifc"), dir.path().join("office.ifc"))?;
    std::fs::copy(
        testdata_path("broken/not_a_model.ifc"),
        dir.path().join("broken.ifc"),
    )?;
    std::fs::write(dir.path().join("notes.txt"), "not a model")?;
    Ok(dir)
}

fn config(db_dir: &Path) -> ModelcheckConfig {
    ModelcheckConfig::new("Office", testdata_path("office_schema.yaml"))
        .with_identification("Identity", "Identifier")
        .with_database(db_dir.join("issues.db"))
        .with_run_date(run_date())
}

#[derive(Default)]
struct RecordingProgress {
    statuses: Mutex<Vec<String>>,
}

impl ProgressSink for RecordingProgress {
    fn progress(&self, _stage: CheckStage, _file: &str, _percent: u8) {}

    fn status(&self, text: &str) {
        self.statuses.lock().unwrap().push(text.to_string());
    }
}

struct CancelOnProgress(CancellationFlag);

impl ProgressSink for CancelOnProgress {
    fn progress(&self, _stage: CheckStage, _file: &str, _percent: u8) {
        self.0.cancel();
    }

    fn status(&self, _text: &str) {}
}

#[tokio::test]
async fn test_batch_checks_directory_and_exports_csv() -> anyhow::Result<()> {
    let models = model_dir()?;
    let db_dir = TempDir::new()?;
    let export = db_dir.path().join("reports").join("issues.csv");
    let progress = Arc::new(RecordingProgress::default());

    let summary = BatchOrchestrator::new(config(db_dir.path()).with_export(&export))
        .with_progress(progress.clone())
        .run(&[models.path()])
        .await?;

    assert_eq!(summary.files.len(), 2);
    assert_eq!(summary.files[0].file, "broken.ifc");
    assert_eq!(summary.files[0].status, FileStatus::Failed);
    assert!(summary.files[0].error.is_some());
    assert_eq!(summary.files[1].file, "office.ifc");
    assert_eq!(summary.files[1].status, FileStatus::Checked);
    assert_eq!(summary.files[1].issue_count, 10);
    assert_eq!(summary.files[1].entity_count, 9);
    assert_eq!(summary.skipped, vec![models.path().join("notes.txt")]);
    assert!(!summary.is_complete());

    assert_eq!(summary.total_issues(), 10);
    assert_eq!(summary.issue_counts.get(&IssueKind::EmptyGroup), Some(&1));
    assert_eq!(summary.issue_counts.get(&IssueKind::ValueOutOfRange), Some(&1));
    assert_eq!(summary.issue_counts.get(&IssueKind::RepetitiveGroup), None);

    assert_eq!(summary.export, Some((export.clone(), ExportFormat::Csv)));
    let content = std::fs::read_to_string(&export)?;
    assert_eq!(content.lines().count(), 11);
    assert!(content.contains("illegal-parent-group"));

    let statuses = progress.statuses.lock().unwrap();
    assert!(statuses.contains(&"[Element] office.ifc".to_string()));
    assert!(statuses.contains(&"[Group] office.ifc".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_rerun_replaces_previous_results() -> anyhow::Result<()> {
    let models = model_dir()?;
    let db_dir = TempDir::new()?;
    let orchestrator = BatchOrchestrator::new(config(db_dir.path()));

    let office = models.path().join("office.ifc");
    let first = orchestrator.run(&[&office]).await?;
    let second = orchestrator.run(&[&office]).await?;
    assert_eq!(first.issue_counts, second.issue_counts);
    assert_eq!(second.total_issues(), 10);
    assert!(second.is_complete());

    let stored = load_run_summary(&db_dir.path().join("issues.db"), "Office", None)
        .await?
        .unwrap();
    assert_eq!(stored.run_date, run_date());
    assert_eq!(stored.entities, 9);
    assert_eq!(stored.files.len(), 1);
    assert_eq!(stored.issue_counts, second.issue_counts);

    assert!(
        load_run_summary(&db_dir.path().join("issues.db"), "Elsewhere", None)
            .await?
            .is_none()
    );
    Ok(())
}

#[tokio::test]
async fn test_cancelled_file_keeps_previous_results() -> anyhow::Result<()> {
    let models = model_dir()?;
    let db_dir = TempDir::new()?;
    let office = models.path().join("office.ifc");
    BatchOrchestrator::new(config(db_dir.path()))
        .run(&[&office])
        .await?;

    let cancel = CancellationFlag::new();
    let summary = BatchOrchestrator::new(config(db_dir.path()))
        .with_progress(Arc::new(CancelOnProgress(cancel.clone())))
        .with_cancellation(cancel)
        .run(&[&office, &office.with_file_name("later.ifc")])
        .await?;

    assert!(summary.cancelled);
    assert_eq!(summary.files.len(), 1);
    assert_eq!(summary.files[0].status, FileStatus::Cancelled);
    assert_eq!(summary.total_issues(), 10);
    Ok(())
}

#[tokio::test]
async fn test_cancelled_before_start_opens_nothing() -> anyhow::Result<()> {
    let models = model_dir()?;
    let db_dir = TempDir::new()?;
    let orchestrator = BatchOrchestrator::new(config(db_dir.path()));
    orchestrator.cancellation().cancel();

    let summary = orchestrator.run(&[models.path()]).await?;
    assert!(summary.cancelled);
    assert!(summary.files.is_empty());
    assert!(summary.issue_counts.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unknown_identification_fails_before_any_file() -> anyhow::Result<()> {
    let models = model_dir()?;
    let db_dir = TempDir::new()?;
    let config = config(db_dir.path()).with_identification("Identity", "Code");

    let error = BatchOrchestrator::new(config)
        .run(&[models.path()])
        .await
        .unwrap_err();
    assert!(matches!(error, Error::Identification(_)));
    assert!(error.is_config());
    assert!(!db_dir.path().join("issues.db").exists());
    Ok(())
}

#[tokio::test]
async fn test_json_export() -> anyhow::Result<()> {
    let models = model_dir()?;
    let db_dir = TempDir::new()?;
    let export = db_dir.path().join("issues.json");

    let summary = BatchOrchestrator::new(config(db_dir.path()).with_export(&export))
        .run(&[models.path().join("office.ifc")])
        .await?;
    assert_eq!(summary.export, Some((export.clone(), ExportFormat::Json)));

    let records: Vec<serde_json::Value> =
        serde_json::from_str(&std::fs::read_to_string(&export)?)?;
    assert_eq!(records.len(), 10);
    assert!(records.iter().all(|r| r["project"] == "Office"));
    Ok(())
}
