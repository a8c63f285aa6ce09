//! Build collaborator: compiles integration sources and persists records

use crate::expectation;
use crate::resolve;
use anyhow::{bail, Context, Result};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

/// Compile every source under the input directory into the output tree.
///
/// Any failure is fatal to the whole build step; a source that will not
/// compile is a broken test fixture, not a runtime discrepancy.
pub fn build_all(input_dir: &Path, out_dir: &Path) -> Result<Vec<PathBuf>> {
    if !input_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut sources: Vec<PathBuf> = fs::read_dir(input_dir)
        .with_context(|| format!("failed to scan {}", input_dir.display()))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some())
        .collect();
    sources.sort();

    let mut artifacts = Vec::with_capacity(sources.len());
    for source in sources {
        artifacts.push(build_test(&source, out_dir)?);
    }
    Ok(artifacts)
}

/// Compile one source test program to wasm32-wasi and persist its extracted
/// expectation record next to the artifact.
pub fn build_test(source: &Path, out_dir: &Path) -> Result<PathBuf> {
    let artifact = artifact_path(source, out_dir);
    if let Some(parent) = artifact.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut command = compiler_command(source, &artifact)?;
    let output = command
        .output()
        .with_context(|| format!("failed to invoke compiler for {}", source.display()))?;
    if !output.status.success() {
        bail!(
            "native compilation of {} failed:\n{}",
            source.display(),
            String::from_utf8_lossy(&output.stderr)
        );
    }

    let record = expectation::extract(source)
        .with_context(|| format!("failed to extract expectations from {}", source.display()))?;
    resolve::persist_record(&artifact, &record)
        .with_context(|| format!("failed to persist record for {}", artifact.display()))?;

    info!(source = %source.display(), artifact = %artifact.display(), "built test case");
    Ok(artifact)
}

/// Deterministic derived artifact path: the source path mirrored under the
/// output directory with a `.wasm` extension.
pub fn artifact_path(source: &Path, out_dir: &Path) -> PathBuf {
    out_dir.join(source).with_extension("wasm")
}

fn compiler_command(source: &Path, artifact: &Path) -> Result<Command> {
    match source.extension().and_then(OsStr::to_str) {
        Some("c") => {
            let mut command = Command::new("clang");
            command
                .arg("-target")
                .arg("wasm32-wasi")
                .arg("-o")
                .arg(artifact)
                .arg(source);
            Ok(command)
        }
        Some("rs") => {
            let mut command = Command::new("rustc");
            command
                .arg("--target")
                .arg("wasm32-wasi")
                .arg("-o")
                .arg(artifact)
                .arg(source);
            Ok(command)
        }
        other => bail!(
            "unrecognized source extension {:?} for {}",
            other.unwrap_or(""),
            source.display()
        ),
    }
}
