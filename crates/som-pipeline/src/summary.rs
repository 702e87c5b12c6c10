//! Batch and run summaries

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use som_store::IssueStore;
use som_validation::IssueKind;

use crate::batch::{FileResult, FileStatus};
use crate::export::ExportFormat;
use crate::Result;

/// Outcome of one batch run
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub project: String,
    pub run_date: NaiveDate,
    /// Results for individual files, in processing order
    pub files: Vec<FileResult>,
    /// Inputs that were not IFC files
    pub skipped: Vec<PathBuf>,
    /// Whether the batch stopped early on request
    pub cancelled: bool,
    /// Issue counts per kind over the whole run, read back from the store
    pub issue_counts: BTreeMap<IssueKind, usize>,
    /// Export target and format, when an export was written
    pub export: Option<(PathBuf, ExportFormat)>,
}

impl BatchSummary {
    fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }

    #[must_use]
    pub fn checked(&self) -> usize {
        self.count(FileStatus::Checked)
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(FileStatus::Failed)
    }

    #[must_use]
    pub fn total_issues(&self) -> usize {
        self.issue_counts.values().sum()
    }

    /// True when every file was checked and nothing was cancelled.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.files.iter().all(|f| f.status == FileStatus::Checked)
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Project {} ({})", self.project, self.run_date)?;
        writeln!(
            f,
            "Files: {} checked, {} failed, {} skipped{}",
            self.checked(),
            self.failed(),
            self.skipped.len(),
            if self.cancelled { ", cancelled" } else { "" }
        )?;
        for file in self.files.iter().filter(|r| r.status != FileStatus::Checked) {
            match &file.error {
                Some(error) => writeln!(f, "  {} {}: {error}", file.status, file.file)?,
                None => writeln!(f, "  {} {}", file.status, file.file)?,
            }
        }
        write_counts(f, &self.issue_counts)?;
        if let Some((path, format)) = &self.export {
            writeln!(f, "Exported to {} ({format:?})", path.display())?;
        }
        Ok(())
    }
}

/// Stored results of one run, as found in an issue database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub project: String,
    pub run_date: NaiveDate,
    /// Files with at least one issue in this run
    pub files: BTreeSet<String>,
    /// Entity records of the project across all files
    pub entities: usize,
    pub issue_counts: BTreeMap<IssueKind, usize>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Project {} ({})", self.project, self.run_date)?;
        writeln!(
            f,
            "{} entities, {} files with issues",
            self.entities,
            self.files.len()
        )?;
        write_counts(f, &self.issue_counts)
    }
}

fn write_counts(f: &mut fmt::Formatter<'_>, counts: &BTreeMap<IssueKind, usize>) -> fmt::Result {
    if counts.is_empty() {
        return writeln!(f, "No issues");
    }
    writeln!(f, "Issues: {}", counts.values().sum::<usize>())?;
    for (kind, count) in counts {
        writeln!(f, "  {:<34} {count:>6}", kind.as_str())?;
    }
    Ok(())
}

/// Read the summary of a stored run. Without `run_date` the latest run of
/// the project is used; `None` means the project has no runs.
///
/// # Errors
///
/// Returns [`crate::Error::Store`] when the database cannot be read.
pub async fn load_run_summary(
    database: &Path,
    project: &str,
    run_date: Option<NaiveDate>,
) -> Result<Option<RunSummary>> {
    let store = IssueStore::init_path(database).await?;
    let reader = store.reader();

    let run_date = match run_date {
        Some(date) => date,
        None => match reader.latest_run_date(project).await? {
            Some(date) => date,
            None => return Ok(None),
        },
    };

    let issues = reader.issues(project, run_date).await?;
    let mut issue_counts = BTreeMap::new();
    for stored in &issues {
        *issue_counts.entry(stored.issue.kind).or_insert(0) += 1;
    }
    Ok(Some(RunSummary {
        project: project.to_string(),
        run_date,
        files: issues.into_iter().map(|stored| stored.file).collect(),
        entities: reader.entities(project, None).await?.len(),
        issue_counts,
    }))
}
