//! Issue export
//!
//! Writes the issues of one run to a flat file, one record per issue.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use som_store::StoredIssue;
use som_validation::{EntityRole, IssueKind};
use tracing::{debug, info};

use crate::{Error, Result};

/// Output format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ExportFormat::Json,
            _ => ExportFormat::Csv,
        }
    }
}

/// One exported issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub project: String,
    pub file: String,
    pub run_date: String,
    pub timestamp: String,
    pub guid: String,
    pub role: EntityRole,
    pub kind: IssueKind,
    pub property_set: Option<String>,
    pub attribute: Option<String>,
    pub value: Option<String>,
    pub detail: String,
}

impl From<&StoredIssue> for ExportRecord {
    fn from(stored: &StoredIssue) -> Self {
        let issue = &stored.issue;
        Self {
            project: stored.project.clone(),
            file: stored.file.clone(),
            run_date: stored.run_date.clone(),
            timestamp: stored.timestamp.clone(),
            guid: issue.guid.clone(),
            role: issue.role,
            kind: issue.kind,
            property_set: issue.property_set.clone(),
            attribute: issue.attribute.clone(),
            value: issue.value.clone(),
            detail: issue.detail.clone(),
        }
    }
}

/// Write issues to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`Error::Io`] when the file cannot be created and
/// [`Error::Export`] when serialization fails.
pub fn export_issues(path: &Path, issues: &[StoredIssue]) -> Result<ExportFormat> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            Error::io("create export directory", parent.display().to_string(), e.to_string())
        })?;
    }
    let file = File::create(path)
        .map_err(|e| Error::io("create export file", path.display().to_string(), e.to_string()))?;

    let records: Vec<ExportRecord> = issues.iter().map(ExportRecord::from).collect();
    let format = ExportFormat::from_path(path);
    let target = path.display().to_string();
    let written = match format {
        ExportFormat::Csv => write_csv(BufWriter::new(file), &records),
        ExportFormat::Json => write_json(BufWriter::new(file), &records),
    };
    written.map_err(|message| Error::export(&target, message))?;

    info!(
        records = records.len(),
        format = ?format,
        "Exported issues to {target}"
    );
    Ok(format)
}

fn write_csv<W: Write>(writer: W, records: &[ExportRecord]) -> std::result::Result<(), String> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(b',')
        .from_writer(writer);

    if records.is_empty() {
        // serde only emits the header together with the first record
        csv_writer
            .write_record([
                "project",
                "file",
                "run_date",
                "timestamp",
                "guid",
                "role",
                "kind",
                "property_set",
                "attribute",
                "value",
                "detail",
            ])
            .map_err(|e| e.to_string())?;
    }
    for record in records {
        csv_writer.serialize(record).map_err(|e| e.to_string())?;
    }

    csv_writer.flush().map_err(|e| e.to_string())?;
    debug!(record_count = records.len(), "Finished writing CSV");
    Ok(())
}

fn write_json<W: Write>(mut writer: W, records: &[ExportRecord]) -> std::result::Result<(), String> {
    serde_json::to_writer_pretty(&mut writer, records).map_err(|e| e.to_string())?;
    writer.flush().map_err(|e| e.to_string())
}
