//! Test expectations embedded as a leading comment block in source files

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Normalized test specification recovered from a source file's annotation
/// header. `env`, `args` and `preopens` are never null in the normalized
/// form; absent keys collapse to their defaults. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub preopens: BTreeMap<String, String>,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub exit_code: i32,
    #[serde(default = "default_timeout")]
    pub timeout: f64,
}

fn default_timeout() -> f64 {
    5.0
}

impl Default for ExpectationRecord {
    fn default() -> Self {
        Self {
            stdin: None,
            env: BTreeMap::new(),
            args: Vec::new(),
            preopens: BTreeMap::new(),
            stdout: String::new(),
            stderr: String::new(),
            exit_code: 0,
            timeout: default_timeout(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExpectationError {
    #[error("malformed expectation header in {}: {message}", .path.display())]
    Malformed { path: PathBuf, message: String },

    #[error("expectation header in {} is not terminated by a blank line", .path.display())]
    Truncated { path: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Extract the annotation header from a source file.
///
/// Every line up to the first fully blank line must carry the `//` marker;
/// the marker is stripped and the remainder parsed as JSON into an
/// [`ExpectationRecord`]. Pure read, no side effects.
pub fn extract(path: &Path) -> Result<ExpectationRecord, ExpectationError> {
    let raw = fs::read_to_string(path).map_err(|err| ExpectationError::Io {
        path: path.to_path_buf(),
        source: err,
    })?;

    let header = extract_header(&raw, path)?;
    serde_json::from_str(&header).map_err(|err| ExpectationError::Malformed {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

fn extract_header(raw: &str, path: &Path) -> Result<String, ExpectationError> {
    let mut header = String::new();

    for line in raw.lines() {
        // The blank line is the sentinel separating header from program body.
        if line.is_empty() {
            return Ok(header);
        }

        match line.strip_prefix("//") {
            Some(rest) => {
                header.push_str(rest);
                header.push('\n');
            }
            None => {
                return Err(ExpectationError::Malformed {
                    path: path.to_path_buf(),
                    message: format!("header line missing `//` marker: {line:?}"),
                })
            }
        }
    }

    Err(ExpectationError::Truncated {
        path: path.to_path_buf(),
    })
}
