//! Canonical persistence and lookup of expectation records

use crate::expectation::ExpectationRecord;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("expected exactly one record for {}, found {found}", .artifact.display())]
    NotFound { artifact: PathBuf, found: usize },

    #[error("unreadable record at {}: {message}", .path.display())]
    Invalid { path: PathBuf, message: String },
}

/// Path of the persisted record adjacent to a compiled artifact.
pub fn record_path(artifact: &Path) -> PathBuf {
    artifact.with_extension("json")
}

/// Render a record in its canonical serialized form: key-sorted, two-space
/// indent, trailing newline. The output is diffed in version control, so the
/// same record must always render byte-identically.
pub fn canonical_json(record: &ExpectationRecord) -> serde_json::Result<String> {
    // Round through Value so object keys come out sorted.
    let value = serde_json::to_value(record)?;
    let mut text = serde_json::to_string_pretty(&value)?;
    text.push('\n');
    Ok(text)
}

/// Persist a record next to its artifact (same base name, `.json` extension).
pub fn persist_record(artifact: &Path, record: &ExpectationRecord) -> std::io::Result<PathBuf> {
    let path = record_path(artifact);
    let text = canonical_json(record).map_err(std::io::Error::other)?;
    fs::write(&path, text)?;
    debug!(record = %path.display(), "persisted expectation record");
    Ok(path)
}

/// Locate and load the persisted record for an artifact by searching the
/// artifact's directory subtree for a file with the artifact's base name and
/// a `.json` extension. Zero or multiple candidates are an error; ambiguity
/// must never silently pick a record.
pub fn resolve_record(artifact: &Path) -> Result<ExpectationRecord, ResolveError> {
    let stem = artifact
        .file_stem()
        .ok_or_else(|| ResolveError::NotFound {
            artifact: artifact.to_path_buf(),
            found: 0,
        })?
        .to_os_string();

    let mut wanted = OsString::from(stem);
    wanted.push(".json");

    let root = artifact.parent().unwrap_or_else(|| Path::new("."));
    let mut matches: Vec<PathBuf> = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == wanted.as_os_str())
        .map(|entry| entry.into_path())
        .collect();

    if matches.len() != 1 {
        return Err(ResolveError::NotFound {
            artifact: artifact.to_path_buf(),
            found: matches.len(),
        });
    }

    let path = matches.remove(0);
    let raw = fs::read_to_string(&path).map_err(|err| ResolveError::Invalid {
        path: path.clone(),
        message: err.to_string(),
    })?;

    serde_json::from_str(&raw).map_err(|err| ResolveError::Invalid {
        path,
        message: err.to_string(),
    })
}
