//! td-bulk-import library - prepare record files as parts and upload them
//! into bulk import sessions

pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod prepare;
pub mod retry;
pub mod upload;

// Re-export commonly used types
pub use client::{BulkImportApi, HttpClient, JobHandle, SessionSummary};
pub use config::{clamp_parallelism, Config, ConfigOptions, PrepareOptions, UploadOptions};
pub use error::{BulkImportError, Result};
pub use prepare::{PartEncoder, Record, RecordEvent};
pub use retry::RetryPolicy;
pub use upload::{UploadReport, UploadWorkerPool};
