#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # som-pipeline
//!
//! Batch orchestration of model checks.
//!
//! A batch expands its input paths to IFC files, loads the schema and builds
//! the identifier index once, then checks the files one after another. Each
//! file's issues and entity records are committed to the issue store in one
//! transaction. At the end all issues of the run can be exported as CSV or
//! JSON.

pub mod batch;
pub mod cancel;
pub mod config;
pub mod export;
pub mod paths;
pub mod progress;
pub mod summary;

pub use batch::{BatchOrchestrator, FileResult, FileStatus};
pub use cancel::CancellationFlag;
pub use config::{IdentificationSettings, ModelcheckConfig};
pub use export::{ExportFormat, ExportRecord, export_issues};
pub use paths::{ExpandedPaths, expand_paths};
pub use progress::{CheckStage, LogProgress, NoProgress, ProgressSink};
pub use summary::{BatchSummary, RunSummary, load_run_summary};

use thiserror::Error;

/// Errors that can occur while running a batch
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Schema error: {0}")]
    Schema(#[from] som_schema::Error),

    #[error("Identification error: {0}")]
    Identification(#[from] som_validation::Error),

    #[error("Issue store error: {0}")]
    Store(#[from] som_store::Error),

    #[error("IO error during {operation} for '{path}': {message}")]
    Io {
        operation: String,
        path: String,
        message: String,
    },

    #[error("Export to '{path}' failed: {message}")]
    Export { path: String, message: String },
}

impl Error {
    /// Create a structured I/O error with operation/path context.
    pub fn io(
        operation: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn export(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Export {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether the error was raised before any file was opened.
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::Schema(_) | Error::Identification(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
