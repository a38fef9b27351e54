//! Reads gzip-compressed MessagePack record streams back into records

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use super::record::Record;
use crate::error::{BulkImportError, Result};

/// Lazy iterator over the records of one part (or any stream in part format)
///
/// Iteration stops after the first error; the stream is not restartable.
pub struct PartDecoder<R: Read> {
    reader: BufReader<MultiGzDecoder<R>>,
    finished: bool,
}

impl PartDecoder<File> {
    /// Open a part file from disk
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| BulkImportError::io(path, e))?;
        Ok(Self::new(file))
    }
}

impl<R: Read> PartDecoder<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(MultiGzDecoder::new(inner)),
            finished: false,
        }
    }
}

impl<R: Read> Iterator for PartDecoder<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.reader.fill_buf() {
            Ok(buf) if buf.is_empty() => {
                self.finished = true;
                return None;
            }
            Ok(_) => {}
            Err(e) => {
                self.finished = true;
                return Some(Err(e.into()));
            }
        }

        let result = rmp_serde::from_read::<_, Record>(&mut self.reader).map_err(Into::into);
        if result.is_err() {
            self.finished = true;
        }
        Some(result)
    }
}

/// Decode every record of a part file
pub fn read_part(path: &Path) -> Result<Vec<Record>> {
    PartDecoder::open(path)?.collect()
}
