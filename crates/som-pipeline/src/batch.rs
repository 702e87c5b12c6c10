//! Batch orchestration
//!
//! Files are checked strictly one after another. Each file gets its own
//! store connection and transaction: earlier results for the file are
//! removed, the new issues and entity records are inserted, and the
//! transaction commits when the file is done. A cancelled file is rolled
//! back, leaving the previous results in place.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use som_ifc::{IfcModel, ModelObject};
use som_schema::{IdentifierIndex, Schema, SchemaLoader};
use som_store::{FileScope, IssueStore};
use som_validation::{
    CheckReport, Checker, EntityRole, GroupTopologyBuilder, IdentificationConfig,
};
use tracing::{debug, info, warn};

use crate::cancel::CancellationFlag;
use crate::config::ModelcheckConfig;
use crate::export::export_issues;
use crate::paths::expand_paths;
use crate::progress::{CheckStage, LogProgress, ProgressSink, percent};
use crate::summary::BatchSummary;
use crate::{Error, Result};

/// Outcome of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Checked and committed
    Checked,
    /// Could not be opened or parsed
    Failed,
    /// Stopped before commit
    Cancelled,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Checked => f.write_str("checked"),
            FileStatus::Failed => f.write_str("failed"),
            FileStatus::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Result of checking a single file
#[derive(Debug, Clone)]
pub struct FileResult {
    /// File path as given
    pub path: PathBuf,
    /// File name stored with the issues
    pub file: String,
    pub status: FileStatus,
    /// Error message if failed
    pub error: Option<String>,
    /// Number of issues written
    pub issue_count: usize,
    /// Number of entity records written
    pub entity_count: usize,
    /// Processing duration
    pub duration: Duration,
}

impl FileResult {
    fn new(path: &Path, status: FileStatus) -> Self {
        Self {
            path: path.to_path_buf(),
            file: file_name(path),
            status,
            error: None,
            issue_count: 0,
            entity_count: 0,
            duration: Duration::ZERO,
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// Everything a file check borrows from the batch
struct CheckContext<'a> {
    checker: Checker<'a>,
    identification: &'a IdentificationConfig,
    database: PathBuf,
    run_date: NaiveDate,
}

/// Runs a batch of model checks against one schema
pub struct BatchOrchestrator {
    config: ModelcheckConfig,
    progress: Arc<dyn ProgressSink>,
    cancel: CancellationFlag,
}

impl fmt::Debug for BatchOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchOrchestrator")
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl BatchOrchestrator {
    /// Create an orchestrator reporting progress through `tracing`
    #[must_use]
    pub fn new(config: ModelcheckConfig) -> Self {
        Self {
            config,
            progress: Arc::new(LogProgress),
            cancel: CancellationFlag::new(),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ModelcheckConfig {
        &self.config
    }

    /// Handle for cancelling a running batch
    #[must_use]
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    /// Check every IFC file found under `inputs`.
    ///
    /// Configuration problems are reported before any file is opened.
    /// A file that cannot be read is recorded as failed and the batch moves
    /// on; a store failure aborts the batch.
    ///
    /// # Errors
    ///
    /// Configuration, schema, store and export errors.
    pub async fn run<P: AsRef<Path>>(&self, inputs: &[P]) -> Result<BatchSummary> {
        let start = Instant::now();
        let (schema, identification) = load_schema(&self.config)?;
        let index = IdentifierIndex::build(&schema);

        let expanded = expand_paths(inputs);
        for skipped in &expanded.skipped {
            debug!("Skipping {}", skipped.display());
        }

        let run_date = self.config.run_date();
        let context = CheckContext {
            checker: Checker::new(&schema, &index, &identification),
            identification: &identification,
            database: self.config.database_path(),
            run_date,
        };
        info!(
            project = %self.config.project,
            files = expanded.files.len(),
            database = %context.database.display(),
            "Starting batch"
        );

        let mut files = Vec::with_capacity(expanded.files.len());
        let mut cancelled = false;
        for path in &expanded.files {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let result = self.check_file(&context, path).await?;
            cancelled = result.status == FileStatus::Cancelled;
            files.push(result);
            if cancelled {
                break;
            }
        }

        let store = IssueStore::init_path(&context.database).await?;
        let reader = store.reader();
        let issue_counts = reader.issue_counts(&self.config.project, run_date).await?;

        let export = match &self.config.export {
            Some(path) => {
                let issues = reader.issues(&self.config.project, run_date).await?;
                let format = export_issues(path, &issues)?;
                Some((path.clone(), format))
            }
            None => None,
        };

        let summary = BatchSummary {
            project: self.config.project.clone(),
            run_date,
            files,
            skipped: expanded.skipped,
            cancelled,
            issue_counts,
            export,
        };
        info!(
            checked = summary.checked(),
            failed = summary.failed(),
            skipped = summary.skipped.len(),
            issues = summary.total_issues(),
            cancelled,
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Batch finished"
        );
        Ok(summary)
    }

    async fn check_file(&self, context: &CheckContext<'_>, path: &Path) -> Result<FileResult> {
        let start = Instant::now();
        let mut result = FileResult::new(path, FileStatus::Checked);
        self.progress.status(&format!("Opening {}", result.file));

        let model = match open_model(path).await {
            Ok(model) => model,
            Err(e) => {
                warn!("Skipping {}: {e}", path.display());
                result.status = FileStatus::Failed;
                result.error = Some(e.to_string());
                result.duration = start.elapsed();
                return Ok(result);
            }
        };

        let store = IssueStore::init_path(&context.database).await?;
        let mut tx = store
            .begin_file(FileScope::new(
                &self.config.project,
                &result.file,
                context.run_date,
            ))
            .await?;

        let Some(report) = self.check_model(context, &model, &result.file) else {
            tx.rollback().await?;
            info!("Cancelled while checking {}", result.file);
            result.status = FileStatus::Cancelled;
            result.duration = start.elapsed();
            return Ok(result);
        };

        result.issue_count = tx.add_issues(&report.issues).await?;
        for entity in &report.entities {
            tx.create_entity(entity).await?;
        }
        result.entity_count = report.entities.len();

        if self.cancel.is_cancelled() {
            tx.rollback().await?;
            result.status = FileStatus::Cancelled;
        } else {
            tx.commit().await?;
        }
        result.duration = start.elapsed();
        info!(
            file = %result.file,
            issues = result.issue_count,
            entities = result.entity_count,
            status = %result.status,
            "Checked file"
        );
        Ok(result)
    }

    /// Run element and group checks; `None` when cancelled part way.
    fn check_model(
        &self,
        context: &CheckContext<'_>,
        model: &IfcModel,
        file: &str,
    ) -> Option<CheckReport> {
        let mut report = CheckReport::new();

        let elements: Vec<&ModelObject> = model.elements().collect();
        self.progress.status(&format!("[{}] {file}", CheckStage::Element));
        for (done, element) in elements.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return None;
            }
            context
                .checker
                .check_element(model, element, EntityRole::Element, &mut report);
            self.progress
                .progress(CheckStage::Element, file, percent(done + 1, elements.len()));
        }

        let forest = GroupTopologyBuilder::new(model, context.identification).build_forest();
        self.progress.status(&format!("[{}] {file}", CheckStage::Group));
        for (done, tree) in forest.trees.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return None;
            }
            context
                .checker
                .check_group_tree(model, &forest, tree, &mut report);
            self.progress
                .progress(CheckStage::Group, file, percent(done + 1, forest.trees.len()));
        }
        context.checker.check_group_cycles(model, &forest, &mut report);

        debug!(
            file,
            elements = elements.len(),
            groups = forest.group_count(),
            issues = report.issues.len(),
            "Model checked"
        );
        Some(report)
    }
}

async fn open_model(path: &Path) -> Result<IfcModel> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || IfcModel::open(&owned).map_err(|e| e.to_string()))
        .await
        .map_err(|e| e.to_string())
        .and_then(|opened| opened)
        .map_err(|message| Error::io("open model", path.display().to_string(), message))
}

fn load_schema(config: &ModelcheckConfig) -> Result<(Schema, IdentificationConfig)> {
    config.validate()?;
    let identification = config.identification_config()?;
    let schema = SchemaLoader::new().load_from_file(&config.schema)?;
    identification.check_against(&schema)?;
    Ok((schema, identification))
}
