use std::fs;
use std::path::{Path, PathBuf};

use log::warn;

use crate::error::Result;
use crate::market::Metric;

/// Locate the file of `metric` inside `<input_dir>/<part>`.
///
/// Matching is a case-insensitive substring test on the file name. A missing
/// part folder or no match is `Ok(None)`; other file-system errors propagate.
pub fn find_metric_file(input_dir: &Path, part: &str, metric: Metric) -> Result<Option<PathBuf>> {
    let part_dir = input_dir.join(part);
    if !part_dir.is_dir() {
        warn!("⚠️ Folder {} not found. Skipping.", part_dir.display());
        return Ok(None);
    }

    let pattern = metric.file_pattern();
    let mut matches = Vec::new();
    for entry in fs::read_dir(&part_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.to_lowercase().contains(pattern) {
            matches.push(name);
        }
    }
    matches.sort();

    match matches.len() {
        0 => {
            warn!("⚠️ No {pattern} file found in {}.", part_dir.display());
            Ok(None)
        }
        n => {
            if n > 1 {
                warn!(
                    "⚠️ {n} files match {pattern} in {}; using {}",
                    part_dir.display(),
                    matches[0]
                );
            }
            Ok(Some(part_dir.join(&matches[0])))
        }
    }
}
