//! Upload results gathered from all workers

use std::fmt::Write as _;
use std::path::PathBuf;

use crate::error::BulkImportError;

/// A file uploaded as one part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedPart {
    pub path: PathBuf,
    pub part_name: String,
    pub size: u64,
}

/// A file whose upload failed for good
#[derive(Debug)]
pub struct FailureRecord {
    pub path: PathBuf,
    pub error: BulkImportError,
}

/// What one worker did before the queue ran dry
#[derive(Debug, Default)]
pub struct WorkerOutcome {
    pub succeeded: Vec<UploadedPart>,
    pub failures: Vec<FailureRecord>,
}

/// Merged outcome of an upload batch
///
/// Entries keep worker completion order. A file appears at most once since
/// every queued path is claimed by exactly one worker.
#[derive(Debug, Default)]
pub struct UploadReport {
    succeeded: Vec<UploadedPart>,
    failures: Vec<FailureRecord>,
    /// Workers that stopped without handing back their outcome
    lost_workers: usize,
}

impl UploadReport {
    /// Append one worker's results
    pub fn merge(&mut self, outcome: WorkerOutcome) {
        self.succeeded.extend(outcome.succeeded);
        self.failures.extend(outcome.failures);
    }

    /// Count a worker whose outcome never arrived
    pub fn record_lost_worker(&mut self) {
        self.lost_workers += 1;
    }

    pub fn lost_workers(&self) -> usize {
        self.lost_workers
    }

    pub fn succeeded(&self) -> &[UploadedPart] {
        &self.succeeded
    }

    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// True when no file failed and every worker reported back
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.lost_workers == 0
    }

    /// Human-readable failure listing, empty when nothing failed
    pub fn failure_summary(&self) -> String {
        if self.is_success() {
            return String::new();
        }

        let mut out = format!("failed to upload {} files.\n", self.failures.len());
        for failure in &self.failures {
            let _ = writeln!(out, "  {}: {}", failure.path.display(), failure.error);
        }
        if self.lost_workers > 0 {
            let _ = writeln!(
                out,
                "  {} upload workers stopped before reporting their files.",
                self.lost_workers
            );
        }
        out
    }
}

impl FromIterator<WorkerOutcome> for UploadReport {
    fn from_iter<I: IntoIterator<Item = WorkerOutcome>>(iter: I) -> Self {
        let mut report = Self::default();
        for outcome in iter {
            report.merge(outcome);
        }
        report
    }
}
