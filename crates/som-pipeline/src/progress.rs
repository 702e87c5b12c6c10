//! Progress reporting

use std::fmt;

use tracing::{debug, info};

/// Phase of a file check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStage {
    Element,
    Group,
}

impl fmt::Display for CheckStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStage::Element => f.write_str("Element"),
            CheckStage::Group => f.write_str("Group"),
        }
    }
}

/// Receives progress updates; calls are fire and forget.
pub trait ProgressSink: Send + Sync {
    /// `percent` is the progress of the current stage, 0 to 100.
    fn progress(&self, stage: CheckStage, file: &str, percent: u8);

    /// Free text status, e.g. the file currently being opened.
    fn status(&self, text: &str);
}

/// Writes progress through `tracing`, logging every tenth percent.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn progress(&self, stage: CheckStage, file: &str, percent: u8) {
        if percent % 10 == 0 {
            debug!(%stage, file, percent, "[{stage}] {file}: {percent}%");
        }
    }

    fn status(&self, text: &str) {
        info!("{text}");
    }
}

/// Discards all updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn progress(&self, _stage: CheckStage, _file: &str, _percent: u8) {}

    fn status(&self, _text: &str) {}
}

/// Percentage of `done` out of `total`; an empty stage counts as complete.
pub(crate) fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    u8::try_from(done.min(total) * 100 / total).unwrap_or(100)
}
