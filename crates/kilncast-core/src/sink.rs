//! Notification sink for run progress and summaries.
//!
//! The engine reports what it does through a sink instead of printing
//! directly, so the CLI can render colored progress while tests capture
//! events. Sinks must be Send + Sync; the pipeline invokes them from its
//! coordinating task only.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::reconcile::{ConvertReason, DeleteReason};

/// One observable step of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A source document was converted and its target written.
    Converted {
        source_rel: PathBuf,
        target_rel: PathBuf,
        reason: ConvertReason,
    },
    /// A target file was deleted.
    Deleted {
        target_rel: PathBuf,
        reason: DeleteReason,
    },
    /// A produced asset output was written or refreshed.
    AssetWritten { output: String },
    /// An unreferenced source attachment was moved to the holding area.
    AssetRetired { source_rel: PathBuf },
    /// A non-fatal problem worth surfacing.
    Warning { message: String },
}

/// Counters for one finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Documents converted.
    pub converted: usize,
    /// Targets deleted.
    pub deleted: usize,
    /// Documents left untouched.
    pub skipped: usize,
    /// Produced asset outputs deleted by garbage collection.
    pub assets_released: usize,
    /// Source attachments moved to the holding area.
    pub assets_retired: usize,
    /// Warnings emitted.
    pub warnings: usize,
    /// True when no filesystem changes were made.
    pub dry_run: bool,
}

impl RunSummary {
    /// True when the run had no work at all.
    pub fn nothing_to_do(&self) -> bool {
        self.converted == 0
            && self.deleted == 0
            && self.assets_released == 0
            && self.assets_retired == 0
    }
}

/// Receives progress events and the final summary of a run.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Called for each observable step, in execution order.
    async fn progress(&self, event: ProgressEvent);

    /// Called once after the run finishes.
    async fn summary(&self, summary: &RunSummary);
}

/// Sink that discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

#[async_trait]
impl NotificationSink for NullSink {
    async fn progress(&self, _event: ProgressEvent) {}

    async fn summary(&self, _summary: &RunSummary) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_with_only_skips_is_nothing_to_do() {
        let summary = RunSummary {
            skipped: 12,
            warnings: 1,
            ..RunSummary::default()
        };
        assert!(summary.nothing_to_do());

        let busy = RunSummary {
            converted: 1,
            ..RunSummary::default()
        };
        assert!(!busy.nothing_to_do());
    }
}
