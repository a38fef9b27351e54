//! Record sources: turn raw input files into records

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use serde_json::Value;

use super::record::{Record, RecordEvent};
use crate::error::{BulkImportError, Result};

/// Something that can turn an input file into a lazy record stream.
///
/// Fatal read errors are yielded as `Err` and end encoding of that file;
/// unparseable input is yielded as [`RecordEvent::Malformed`].
pub trait RecordSource {
    type Records: Iterator<Item = Result<RecordEvent>>;

    fn open(&self, path: &Path) -> Result<Self::Records>;
}

/// Newline-delimited JSON objects, gzip-compressed when the file ends in `.gz`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLinesSource;

impl RecordSource for JsonLinesSource {
    type Records = JsonLines<Box<dyn BufRead + Send>>;

    fn open(&self, path: &Path) -> Result<Self::Records> {
        let file = File::open(path).map_err(|e| BulkImportError::io(path, e))?;

        let is_gzip = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("gz"))
            .unwrap_or(false);

        let reader: Box<dyn BufRead + Send> = if is_gzip {
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        Ok(JsonLines::new(reader))
    }
}

/// Iterator over the lines of a JSON-lines stream
pub struct JsonLines<R: BufRead> {
    reader: R,
    line: Vec<u8>,
    finished: bool,
}

impl<R: BufRead> JsonLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            finished: false,
        }
    }

    fn parse_line(line: &[u8]) -> RecordEvent {
        let text = match std::str::from_utf8(line) {
            Ok(t) => t,
            Err(e) => {
                return RecordEvent::Malformed {
                    reason: format!("invalid UTF-8: {}", e),
                    raw: String::from_utf8_lossy(line).into_owned(),
                }
            }
        };

        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(fields)) => RecordEvent::Record(Record::new(fields)),
            Ok(_) => RecordEvent::Malformed {
                reason: "record is not a JSON object".to_string(),
                raw: text.to_string(),
            },
            Err(e) => RecordEvent::Malformed {
                reason: format!("invalid JSON: {}", e),
                raw: text.to_string(),
            },
        }
    }
}

impl<R: BufRead> Iterator for JsonLines<R> {
    type Item = Result<RecordEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            self.line.clear();
            match self.reader.read_until(b'\n', &mut self.line) {
                Ok(0) => self.finished = true,
                Ok(_) => {
                    let trimmed = self.line.trim_ascii();
                    if trimmed.is_empty() {
                        continue;
                    }
                    return Some(Ok(Self::parse_line(trimmed)));
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
            }
        }
        None
    }
}
