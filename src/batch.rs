//! Input discovery and output naming for multi-file runs.

use crate::error::{PipelineError, Result};
use glob::glob;
use std::fs;
use std::path::{Path, PathBuf};

/// Extension replaced when deriving output names.
const INPUT_EXTENSION: &str = ".txt";

/// Files in `dir` matching `pattern`, sorted by path.
///
/// Directories are ignored. Unreadable entries are skipped.
pub fn collect_inputs(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full = dir.join(pattern);
    let full = full
        .to_str()
        .ok_or_else(|| PipelineError::Pattern(format!("non-UTF-8 path {}", full.display())))?;

    let mut inputs: Vec<PathBuf> = glob(full)
        .map_err(|e| PipelineError::Pattern(format!("'{}': {}", full, e)))?
        .filter_map(std::result::Result::ok)
        .filter(|path| path.is_file())
        .collect();
    inputs.sort();
    Ok(inputs)
}

/// Expand arguments that contain wildcards; plain paths pass through.
pub fn expand_wildcards(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut expanded = Vec::with_capacity(paths.len());
    for path in paths {
        let text = path.to_string_lossy();
        if text.contains('*') || text.contains('?') {
            let (dir, pattern) = match (path.parent(), path.file_name()) {
                (Some(dir), Some(name)) => (dir, name.to_string_lossy()),
                _ => (Path::new(""), text.clone()),
            };
            expanded.extend(collect_inputs(dir, &pattern)?);
        } else {
            expanded.push(path.clone());
        }
    }
    Ok(expanded)
}

/// Output path for `input` inside `out_dir`.
///
/// A trailing `.txt` is replaced by `suffix`; any other name gets `suffix`
/// appended.
pub fn output_path(input: &Path, out_dir: &Path, suffix: &str) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.strip_suffix(INPUT_EXTENSION).unwrap_or(&name);
    out_dir.join(format!("{}{}", stem, suffix))
}

/// Directory outputs go to when none is given: the input's own directory.
pub fn default_out_dir(input: &Path) -> PathBuf {
    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Create the output directory if it does not exist.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    Ok(())
}
