//! Per-case isolated working directories

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Exclusively-owned working directory for one test case.
///
/// Holds a private snapshot of the shared fixture tree (copied, not shared,
/// so adapters may read and write freely) and a `scratch` subdirectory that
/// is wiped before every adapter run within the case. The directory is
/// removed when the workspace is dropped.
pub struct CaseWorkspace {
    root: TempDir,
    scratch: PathBuf,
}

impl CaseWorkspace {
    /// Create a fresh workspace and snapshot the fixture tree into it.
    ///
    /// Symbolic links are copied verbatim, not followed; some conformance
    /// cases depend on symlink semantics. A missing fixtures directory
    /// yields an empty snapshot.
    pub fn prepare(fixtures: &Path) -> Result<Self> {
        let root = TempDir::new().context("failed to create case workspace")?;

        if fixtures.is_dir() {
            let name = fixtures
                .file_name()
                .map(|name| name.to_os_string())
                .unwrap_or_else(|| "fixtures".into());
            let dest = root.path().join(name);
            copy_tree(fixtures, &dest).with_context(|| {
                format!("failed to snapshot fixtures from {}", fixtures.display())
            })?;
        }

        let scratch = root.path().join("scratch");
        fs::create_dir(&scratch).context("failed to create scratch directory")?;

        debug!(workspace = %root.path().display(), "prepared case workspace");
        Ok(Self { root, scratch })
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn scratch(&self) -> &Path {
        &self.scratch
    }

    /// Wipe and recreate the scratch subdirectory so no adapter can observe
    /// another adapter's leftover files. Called once per adapter run.
    pub fn reset_scratch(&self) -> Result<()> {
        if self.scratch.exists() {
            fs::remove_dir_all(&self.scratch).with_context(|| {
                format!("failed to clear scratch at {}", self.scratch.display())
            })?;
        }
        fs::create_dir(&self.scratch)
            .with_context(|| format!("failed to recreate scratch at {}", self.scratch.display()))?;
        Ok(())
    }
}

fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let target = dest.join(entry.file_name());

        if file_type.is_symlink() {
            let link = fs::read_link(entry.path())?;
            #[cfg(unix)]
            std::os::unix::fs::symlink(&link, &target)?;
            #[cfg(not(unix))]
            anyhow::bail!(
                "cannot snapshot symlink {} on this platform",
                entry.path().display()
            );
        } else if file_type.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}
