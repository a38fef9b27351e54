//! Part names for uploaded files

use std::path::Path;

/// Name a file's part: `prefix` plus the first `suffix_count + 1`
/// dot-separated components of the basename, joined with `_`.
///
/// `a.b.c.d.csv` with prefix `x_` gives `x_a` (0 dots kept) or `x_a_b` (1).
pub fn upload_part_name(prefix: &str, path: &Path, suffix_count: usize) -> String {
    let basename = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();

    let kept: Vec<&str> = basename
        .split('.')
        .take(suffix_count.saturating_add(1))
        .collect();

    format!("{}{}", prefix, kept.join("_"))
}
