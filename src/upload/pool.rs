//! Fixed-size pool of upload workers draining a shared file queue

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::task::JoinSet;
use tracing::{error, info};

use super::naming::upload_part_name;
use super::report::{FailureRecord, UploadReport, UploadedPart, WorkerOutcome};
use crate::client::BulkImportApi;
use crate::config::clamp_parallelism;
use crate::error::{BulkImportError, Result};
use crate::retry::RetryPolicy;

/// Paths waiting to be claimed by a worker
#[derive(Debug, Default)]
pub struct WorkQueue {
    paths: Mutex<VecDeque<PathBuf>>,
}

impl WorkQueue {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            paths: Mutex::new(paths.into_iter().collect()),
        }
    }

    /// Claim the next path; each path is handed out once
    pub fn pop(&self) -> Option<PathBuf> {
        self.paths
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
    }
}

/// Everything a worker needs to upload files into one session
struct UploadJob {
    client: Arc<dyn BulkImportApi>,
    retry: RetryPolicy,
    session: String,
    prefix: String,
    suffix_count: usize,
}

impl UploadJob {
    /// Upload queued files until the queue is empty.
    ///
    /// Each file runs in its own task so a panicking upload is recorded as a
    /// failure of that file instead of taking the worker down with it.
    async fn drain(self: Arc<Self>, worker: usize, queue: &WorkQueue) -> WorkerOutcome {
        let mut outcome = WorkerOutcome::default();

        while let Some(path) = queue.pop() {
            let part_name = upload_part_name(&self.prefix, &path, self.suffix_count);

            let task = tokio::spawn({
                let job = self.clone();
                let path = path.clone();
                let part_name = part_name.clone();
                async move {
                    upload_file(
                        job.client.as_ref(),
                        &job.retry,
                        &job.session,
                        &path,
                        &part_name,
                    )
                    .await
                }
            });

            let uploaded = match task.await {
                Ok(result) => result,
                Err(e) => Err(BulkImportError::Task(e.to_string())),
            };

            match uploaded {
                Ok(size) => outcome.succeeded.push(UploadedPart {
                    path,
                    part_name,
                    size,
                }),
                Err(e) => {
                    error!(
                        "[worker {}] Failed to upload '{}': {}",
                        worker,
                        path.display(),
                        e
                    );
                    outcome.failures.push(FailureRecord { path, error: e });
                }
            }
        }

        outcome
    }
}

/// Upload one file as `part_name`, retrying under `retry`.
///
/// Every attempt opens its own handle and sends the file from its first
/// byte. Returns the file size.
pub async fn upload_file(
    client: &dyn BulkImportApi,
    retry: &RetryPolicy,
    session: &str,
    path: &Path,
    part_name: &str,
) -> Result<u64> {
    let size = tokio::fs::metadata(path)
        .await
        .map_err(|e| BulkImportError::io(path, e))?
        .len();

    info!(
        "Uploading '{}' -> '{}'... ({} bytes)",
        path.display(),
        part_name,
        size
    );

    retry
        .run(part_name, move || async move {
            let body = tokio::fs::File::open(path)
                .await
                .map_err(|e| BulkImportError::io(path, e))?;

            client.upload_part(session, part_name, body, size).await
        })
        .await?;

    Ok(size)
}

/// Uploads files as parts with a bounded number of concurrent workers
pub struct UploadWorkerPool {
    client: Arc<dyn BulkImportApi>,
    retry: RetryPolicy,
    workers: usize,
}

impl UploadWorkerPool {
    /// `parallel` is clamped into `[1, 8]`
    pub fn new(client: Arc<dyn BulkImportApi>, retry: RetryPolicy, parallel: i64) -> Self {
        Self {
            client,
            retry,
            workers: clamp_parallelism(parallel),
        }
    }

    /// Effective number of workers
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Upload every file into `session`, one part per file.
    ///
    /// A failing file never stops the other uploads; it ends up in the
    /// returned report. Returns once every worker has finished.
    pub async fn upload(
        &self,
        session: &str,
        files: Vec<PathBuf>,
        prefix: &str,
        suffix_count: usize,
    ) -> UploadReport {
        let queue = Arc::new(WorkQueue::new(files));
        let job = Arc::new(UploadJob {
            client: self.client.clone(),
            retry: self.retry,
            session: session.to_string(),
            prefix: prefix.to_string(),
            suffix_count,
        });

        let mut workers = JoinSet::new();
        for worker in 0..self.workers {
            let queue = queue.clone();
            let job = job.clone();
            workers.spawn(async move { job.drain(worker, &queue).await });
        }

        let mut report = UploadReport::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(outcome) => report.merge(outcome),
                Err(e) => {
                    error!("Upload worker stopped unexpectedly: {}", e);
                    report.record_lost_worker();
                }
            }
        }

        report
    }
}
