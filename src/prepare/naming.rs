//! Part file naming for prepared parts

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

/// Extension of prepared part files
pub const PART_EXTENSION: &str = "msgpack.gz";

fn known_extension() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\.(?:csv|tsv|json|msgpack)(?:\.gz)?$").expect("static regex is valid")
    })
}

/// Derive the base of every part name from an input file path.
///
/// The known input extension (and a trailing `.gz`) is dropped and the
/// remaining dots become underscores: `logs.2024.01.csv.gz` -> `logs_2024_01`.
pub fn part_base_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();

    known_extension()
        .replace(&file_name, "")
        .split('.')
        .collect::<Vec<_>>()
        .join("_")
}

/// Logical part name: `<base>_<index>`
pub fn part_name(base: &str, index: usize) -> String {
    format!("{}_{}", base, index)
}

/// File name of a prepared part: `<base>_<index>.msgpack.gz`
pub fn part_file_name(base: &str, index: usize) -> String {
    format!("{}.{}", part_name(base, index), PART_EXTENSION)
}
