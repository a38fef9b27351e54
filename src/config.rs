//! Configuration module - endpoint, credentials and per-command options

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{BulkImportError, Result};
use crate::retry::RetryPolicy;

/// Default API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.treasuredata.com";

/// Default number of reattempts after a failed upload
pub const DEFAULT_RETRY_LIMIT: u32 = 10;

/// Default wait between upload attempts in seconds
pub const DEFAULT_RETRY_WAIT_SECS: u64 = 1;

/// Default HTTP request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 600;

/// Minimum number of upload workers
pub const MIN_PARALLEL: usize = 1;
/// Maximum number of upload workers
pub const MAX_PARALLEL: usize = 8;
/// Default number of upload workers
pub const DEFAULT_PARALLEL: i64 = 2;

/// Default part split size (16MB)
pub const PART_SPLIT_SIZE: u64 = 16 * 1024 * 1024;

/// Optional configuration parameters for Config::new()
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    pub retry_limit: Option<u32>,
    pub retry_wait_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: String,
    pub api_key: String,
    pub retry: RetryPolicy,
    pub request_timeout_secs: u64,
}

impl Config {
    /// Create a new Config with required endpoint and API key, plus optional settings
    pub fn new(endpoint: String, api_key: String, options: ConfigOptions) -> Result<Arc<Self>> {
        let endpoint = endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty() {
            return Err(BulkImportError::Config(
                "endpoint cannot be empty".to_string(),
            ));
        }

        let endpoint = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("https://{}", endpoint)
        };

        let api_key = api_key.trim().to_string();
        if api_key.is_empty() {
            return Err(BulkImportError::Config(
                "API key cannot be empty (set --apikey or TD_API_KEY)".to_string(),
            ));
        }

        let request_timeout_secs = options
            .request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        if request_timeout_secs == 0 {
            return Err(BulkImportError::Config(
                "request timeout must be at least 1 second".to_string(),
            ));
        }

        Ok(Arc::new(Self {
            endpoint,
            api_key,
            retry: RetryPolicy::new(
                options.retry_limit.unwrap_or(DEFAULT_RETRY_LIMIT),
                Duration::from_secs(options.retry_wait_secs.unwrap_or(DEFAULT_RETRY_WAIT_SECS)),
            ),
            request_timeout_secs,
        }))
    }
}

/// Clamp a requested worker count into `[MIN_PARALLEL, MAX_PARALLEL]`
pub fn clamp_parallelism(requested: i64) -> usize {
    if requested <= MIN_PARALLEL as i64 {
        MIN_PARALLEL
    } else if requested >= MAX_PARALLEL as i64 {
        MAX_PARALLEL
    } else {
        requested as usize
    }
}

/// Options for the upload-parts command
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Prepended to every derived part name
    pub prefix: String,
    /// Number of dots of the source file name kept in the part name
    pub suffix_count: usize,
    /// Start the perform job once every file was uploaded
    pub auto_perform: bool,
    /// Requested worker count, clamped by [`UploadOptions::parallelism`]
    pub parallel: i64,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            suffix_count: 0,
            auto_perform: false,
            parallel: DEFAULT_PARALLEL,
        }
    }
}

impl UploadOptions {
    /// Effective number of upload workers
    pub fn parallelism(&self) -> usize {
        clamp_parallelism(self.parallel)
    }
}

/// Raw options for the prepare-parts command
#[derive(Debug, Clone)]
pub struct PrepareOptions {
    pub output_dir: Option<PathBuf>,
    pub split_size_kb: u64,
    pub parallel: i64,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            output_dir: None,
            split_size_kb: PART_SPLIT_SIZE / 1024,
            parallel: 1,
        }
    }
}

/// Validated prepare-parts settings
#[derive(Debug, Clone)]
pub struct PrepareConfig {
    pub output_dir: PathBuf,
    pub split_size: u64,
    pub parallel: usize,
}

impl PrepareOptions {
    /// Reject unusable options before any file is touched
    pub fn validate(self) -> Result<PrepareConfig> {
        let output_dir = self.output_dir.ok_or_else(|| {
            BulkImportError::Config("-o, --output DIR option is required".to_string())
        })?;

        if self.split_size_kb == 0 {
            return Err(BulkImportError::Config(
                "split size must be at least 1 KB".to_string(),
            ));
        }

        let split_size = self.split_size_kb.checked_mul(1024).ok_or_else(|| {
            BulkImportError::Config(format!("split size {}KB is too large", self.split_size_kb))
        })?;

        Ok(PrepareConfig {
            output_dir,
            split_size,
            parallel: clamp_parallelism(self.parallel),
        })
    }
}
