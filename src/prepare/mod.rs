//! Part preparation - convert record files into uploadable parts

mod decoder;
mod encoder;
mod naming;
mod record;
mod source;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::info;

pub use decoder::{read_part, PartDecoder};
pub use encoder::{EncodeSummary, ErrorHandler, LogErrorHandler, PartEncoder, PreparedPart};
pub use naming::{part_base_name, part_file_name, part_name, PART_EXTENSION};
pub use record::{Record, RecordEvent, TIME_FIELD};
pub use source::{JsonLines, JsonLinesSource, RecordSource};

use crate::config::PrepareConfig;
use crate::error::{BulkImportError, Result};

/// Encode one input file into parts under the encoder's output directory
pub fn prepare_file<S>(encoder: &PartEncoder, source: &S, path: &Path) -> Result<EncodeSummary>
where
    S: RecordSource + ?Sized,
{
    info!("Processing {}...", path.display());

    let base = part_base_name(path);
    let records = source.open(path)?;
    let summary = encoder.encode(&base, records, &mut LogErrorHandler)?;

    info!("  {}: {} entries.", path.display(), summary.records);
    Ok(summary)
}

/// Reject inputs whose parts would land on the same file names
fn check_base_names(files: &[PathBuf]) -> Result<()> {
    let mut seen: HashMap<String, &PathBuf> = HashMap::new();
    for path in files {
        let base = part_base_name(path);
        if let Some(other) = seen.get(&base) {
            return Err(BulkImportError::Config(format!(
                "'{}' and '{}' would both write parts named '{}_*'",
                other.display(),
                path.display(),
                base
            )));
        }
        seen.insert(base, path);
    }
    Ok(())
}

/// Encode every input file, one file per worker thread.
///
/// Inputs sharing a part base name are refused before anything is written.
/// The output directory is created up front; the first failing file aborts
/// the run.
pub fn prepare_parts<S>(
    files: &[PathBuf],
    config: &PrepareConfig,
    source: &S,
) -> Result<Vec<(PathBuf, EncodeSummary)>>
where
    S: RecordSource + Sync + ?Sized,
{
    check_base_names(files)?;

    fs::create_dir_all(&config.output_dir)
        .map_err(|e| BulkImportError::io(&config.output_dir, e))?;

    let encoder = PartEncoder::new(&config.output_dir, config.split_size);
    let run = |path: &PathBuf| -> Result<(PathBuf, EncodeSummary)> {
        prepare_file(&encoder, source, path).map(|summary| (path.clone(), summary))
    };

    if config.parallel <= 1 || files.len() <= 1 {
        return files.iter().map(run).collect();
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.parallel)
        .build()
        .map_err(|e| BulkImportError::Config(format!("failed to start worker threads: {}", e)))?;

    pool.install(|| files.par_iter().map(run).collect())
}
