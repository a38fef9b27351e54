//! Part encoder - splits a record stream into bounded gzip/MessagePack parts

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::DateTime;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{info, warn};

use super::naming::{part_file_name, part_name};
use super::record::{Record, RecordEvent};
use crate::error::{BulkImportError, Result};

/// Receives input that could not be parsed into a record
pub trait ErrorHandler {
    fn on_error(&mut self, reason: &str, raw: &str);
}

impl<F: FnMut(&str, &str)> ErrorHandler for F {
    fn on_error(&mut self, reason: &str, raw: &str) {
        self(reason, raw)
    }
}

/// Logs malformed input and moves on
#[derive(Debug, Default)]
pub struct LogErrorHandler;

impl ErrorHandler for LogErrorHandler {
    fn on_error(&mut self, reason: &str, raw: &str) {
        warn!("{}: {}", reason, raw);
    }
}

/// A closed part on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPart {
    pub name: String,
    pub path: PathBuf,
    pub records: u64,
    /// MessagePack bytes written before compression
    pub raw_bytes: u64,
}

/// Outcome of encoding one input stream
#[derive(Debug, Clone, Default)]
pub struct EncodeSummary {
    pub parts: Vec<PreparedPart>,
    pub records: u64,
    pub malformed: u64,
}

/// Part currently receiving records
struct OpenPart {
    name: String,
    path: PathBuf,
    writer: GzEncoder<BufWriter<File>>,
    records: u64,
    raw_bytes: u64,
}

impl OpenPart {
    fn create(output_dir: &Path, base: &str, index: usize) -> Result<Self> {
        let path = output_dir.join(part_file_name(base, index));
        let file = File::create(&path).map_err(|e| BulkImportError::io(&path, e))?;

        Ok(Self {
            name: part_name(base, index),
            path,
            writer: GzEncoder::new(BufWriter::new(file), Compression::default()),
            records: 0,
            raw_bytes: 0,
        })
    }

    fn append(&mut self, record: &Record) -> Result<()> {
        let bytes = rmp_serde::to_vec(record)?;
        self.writer
            .write_all(&bytes)
            .map_err(|e| BulkImportError::io(&self.path, e))?;
        self.records += 1;
        self.raw_bytes += bytes.len() as u64;
        Ok(())
    }

    /// Write the gzip trailer and flush the file
    fn close(self) -> Result<PreparedPart> {
        let mut inner = self
            .writer
            .finish()
            .map_err(|e| BulkImportError::io(&self.path, e))?;
        inner
            .flush()
            .map_err(|e| BulkImportError::io(&self.path, e))?;

        Ok(PreparedPart {
            name: self.name,
            path: self.path,
            records: self.records,
            raw_bytes: self.raw_bytes,
        })
    }
}

/// Splits record streams into parts of roughly `split_size` uncompressed bytes
#[derive(Debug, Clone)]
pub struct PartEncoder {
    output_dir: PathBuf,
    split_size: u64,
}

impl PartEncoder {
    pub fn new(output_dir: impl Into<PathBuf>, split_size: u64) -> Self {
        Self {
            output_dir: output_dir.into(),
            split_size,
        }
    }

    /// Encode `events` into parts named `<base>_<index>.msgpack.gz`.
    ///
    /// A part is closed right after the record that pushes its uncompressed
    /// size past the split size, so only the last part may be smaller. The
    /// part being written is closed on every exit path, including errors.
    pub fn encode<I, H>(&self, base: &str, events: I, on_error: &mut H) -> Result<EncodeSummary>
    where
        I: IntoIterator<Item = Result<RecordEvent>>,
        H: ErrorHandler + ?Sized,
    {
        let mut summary = EncodeSummary::default();
        let mut current: Option<OpenPart> = None;

        let result = self.encode_into(base, events, on_error, &mut current, &mut summary);

        match result {
            Ok(()) => {
                if let Some(part) = current.take() {
                    summary.parts.push(part.close()?);
                }
                Ok(summary)
            }
            Err(e) => {
                if let Some(part) = current.take() {
                    let name = part.name.clone();
                    match part.close() {
                        Ok(_) => warn!("  Closed part \"{}\" after error: {}", name, e),
                        Err(close_err) => {
                            warn!("  Failed to close part \"{}\": {}", name, close_err)
                        }
                    }
                }
                Err(e)
            }
        }
    }

    fn encode_into<I, H>(
        &self,
        base: &str,
        events: I,
        on_error: &mut H,
        current: &mut Option<OpenPart>,
        summary: &mut EncodeSummary,
    ) -> Result<()>
    where
        I: IntoIterator<Item = Result<RecordEvent>>,
        H: ErrorHandler + ?Sized,
    {
        for event in events {
            let record = match event? {
                RecordEvent::Record(record) => record,
                RecordEvent::Malformed { reason, raw } => {
                    summary.malformed += 1;
                    on_error.on_error(&reason, &raw);
                    continue;
                }
            };

            if current.is_none() {
                let part = OpenPart::create(&self.output_dir, base, summary.parts.len())?;
                info!("  Preparing part \"{}\"...", part.name);
                log_sample(&record);
                *current = Some(part);
            }

            let full = match current.as_mut() {
                Some(part) => {
                    part.append(&record)?;
                    part.raw_bytes > self.split_size
                }
                None => false,
            };
            summary.records += 1;

            if full {
                if let Some(part) = current.take() {
                    summary.parts.push(part.close()?);
                }
            }
        }

        Ok(())
    }
}

fn log_sample(record: &Record) {
    let time = record
        .time()
        .and_then(|t| DateTime::from_timestamp(t, 0))
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string());

    match time {
        Some(time) => info!("  sample: {} {}", time, record.to_json()),
        None => info!("  sample: {}", record.to_json()),
    }
}
