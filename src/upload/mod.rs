//! Part upload - push prepared files into a bulk import session

mod naming;
mod pool;
mod report;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

pub use naming::upload_part_name;
pub use pool::{upload_file, UploadWorkerPool, WorkQueue};
pub use report::{FailureRecord, UploadReport, UploadedPart, WorkerOutcome};

use crate::client::{BulkImportApi, JobHandle};
use crate::config::UploadOptions;
use crate::error::Result;
use crate::retry::RetryPolicy;

/// Result of an upload-parts run
#[derive(Debug)]
pub struct UploadOutcome {
    pub report: UploadReport,
    /// Set when auto-perform queued a job
    pub job: Option<JobHandle>,
}

/// Upload `files` into `session` and optionally start the perform job.
///
/// Per-file failures are collected in the report. The perform job is only
/// requested when every file was uploaded; a failing perform call is
/// returned as an error.
pub async fn upload_parts(
    client: Arc<dyn BulkImportApi>,
    retry: RetryPolicy,
    session: &str,
    files: Vec<PathBuf>,
    options: &UploadOptions,
) -> Result<UploadOutcome> {
    let pool = UploadWorkerPool::new(client.clone(), retry, options.parallel);
    info!(
        "Uploading {} files into '{}' with {} workers",
        files.len(),
        session,
        pool.workers()
    );

    let report = pool
        .upload(session, files, &options.prefix, options.suffix_count)
        .await;

    if !report.is_success() || !options.auto_perform {
        return Ok(UploadOutcome { report, job: None });
    }

    let job = client.perform_bulk_import(session).await?;
    info!("Job {} is queued.", job.job_id);

    Ok(UploadOutcome {
        report,
        job: Some(job),
    })
}
