//! Error types shared by the encoder, the uploader and the remote client

use std::path::PathBuf;

use thiserror::Error;

/// Library-wide result alias
pub type Result<T> = std::result::Result<T, BulkImportError>;

/// Errors raised while preparing or uploading parts
#[derive(Debug, Error)]
pub enum BulkImportError {
    // ── Configuration ───────────────────────────────────────────────────────
    #[error("Invalid configuration: {0}")]
    Config(String),

    // ── Remote API ──────────────────────────────────────────────────────────
    #[error("{0} does not exist")]
    NotFound(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    // ── Upload tasks ────────────────────────────────────────────────────────
    #[error("Upload task failed: {0}")]
    Task(String),

    // ── Local files ─────────────────────────────────────────────────────────
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Stream(#[from] std::io::Error),

    // ── Part encoding ───────────────────────────────────────────────────────
    #[error("Failed to encode record: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("Failed to decode record: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

impl BulkImportError {
    /// Attach the offending path to an I/O error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the remote side reported the resource as absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
