//! Matrix orchestration: discovery, grading and the pass/fail report

use crate::adapter::{ExecutionResult, InvocationDescriptor, RuntimeAdapter};
use crate::expectation::ExpectationRecord;
use crate::resolve;
use crate::workspace::CaseWorkspace;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Graded outcome of one (artifact, adapter) cell.
///
/// `Fail` means the runtimes disagreed with the expectation; `Error` means
/// the harness or adapter itself broke. The two are never collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Fail,
    Error,
}

#[derive(Debug, Clone)]
pub struct Cell {
    pub adapter: &'static str,
    pub outcome: Outcome,
    /// Adapter error message, present only for `Error` cells.
    pub detail: Option<String>,
}

/// One artifact's full row across all adapters. A row either carries cells
/// or an aggregate error (expectation resolution or workspace preparation
/// failed before any adapter could run).
#[derive(Debug, Clone)]
pub struct CaseRow {
    pub artifact: PathBuf,
    pub cells: Vec<Cell>,
    pub error: Option<String>,
}

/// Append-only result of a full matrix run.
#[derive(Debug, Default)]
pub struct MatrixReport {
    pub rows: Vec<CaseRow>,
}

impl MatrixReport {
    pub fn all_passed(&self) -> bool {
        self.rows.iter().all(|row| {
            row.error.is_none() && row.cells.iter().all(|cell| cell.outcome == Outcome::Pass)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Presentation hook; the engine stays silent and the caller decides how to
/// render progress.
pub trait Progress {
    fn case_started(&mut self, artifact: &Path) {
        let _ = artifact;
    }

    fn case_failed(&mut self, artifact: &Path, message: &str) {
        let _ = (artifact, message);
    }

    fn cell_recorded(&mut self, cell: &Cell) {
        let _ = cell;
    }
}

/// No-op progress sink for library callers and tests.
pub struct SilentProgress;

impl Progress for SilentProgress {}

/// Pure grading contract: `Pass` iff stdout, stderr and exit code all match
/// exactly and the run did not time out. No text normalization of any kind.
pub fn grade(result: &ExecutionResult, expected: &ExpectationRecord) -> Outcome {
    let matched = !result.timed_out
        && result.stdout == expected.stdout.as_bytes()
        && result.stderr == expected.stderr.as_bytes()
        && result.exit_code == Some(expected.exit_code);

    if matched {
        Outcome::Pass
    } else {
        Outcome::Fail
    }
}

pub struct Matrix {
    adapters: Vec<Box<dyn RuntimeAdapter>>,
    artifact_root: PathBuf,
    fixtures_dir: PathBuf,
}

impl Matrix {
    /// Matrix over the conventional artifact and fixture locations.
    pub fn new(adapters: Vec<Box<dyn RuntimeAdapter>>) -> Self {
        Self::with_paths(adapters, "target/wasm32-wasi", "fixtures")
    }

    pub fn with_paths(
        adapters: Vec<Box<dyn RuntimeAdapter>>,
        artifact_root: impl Into<PathBuf>,
        fixtures_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            adapters,
            artifact_root: artifact_root.into(),
            fixtures_dir: fixtures_dir.into(),
        }
    }

    /// All `.wasm` artifacts under the artifact root, lexicographically
    /// sorted so reports are diffable across runs. A missing root is simply
    /// an empty matrix.
    pub fn discover(&self) -> Vec<PathBuf> {
        let mut artifacts: Vec<PathBuf> = WalkDir::new(&self.artifact_root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| {
                entry.file_type().is_file()
                    && entry.path().extension() == Some(OsStr::new("wasm"))
            })
            .map(|entry| entry.into_path())
            .collect();
        artifacts.sort();
        artifacts
    }

    /// Drive every discovered artifact through every adapter and aggregate
    /// the report. No single bad case halts the matrix; cell-level failures
    /// are recorded, never propagated.
    pub fn run(&self, progress: &mut dyn Progress) -> MatrixReport {
        let mut report = MatrixReport::default();

        for artifact in self.discover() {
            progress.case_started(&artifact);
            let row = self.run_case(&artifact, progress);
            if let Some(message) = &row.error {
                warn!(artifact = %artifact.display(), %message, "case aborted");
                progress.case_failed(&artifact, message);
            }
            report.rows.push(row);
        }

        report
    }

    fn run_case(&self, artifact: &Path, progress: &mut dyn Progress) -> CaseRow {
        let record = match resolve::resolve_record(artifact) {
            Ok(record) => record,
            Err(err) => return CaseRow::aborted(artifact, err.to_string()),
        };

        let workspace = match CaseWorkspace::prepare(&self.fixtures_dir) {
            Ok(workspace) => workspace,
            Err(err) => return CaseRow::aborted(artifact, format!("{err:#}")),
        };

        // Adapters run from the workspace root, so the artifact path must
        // stay valid from there.
        let absolute = artifact
            .canonicalize()
            .unwrap_or_else(|_| artifact.to_path_buf());

        let mut cells = Vec::new();
        for adapter in &self.adapters {
            let cell = self.run_cell(adapter.as_ref(), &absolute, &record, &workspace);
            debug!(adapter = cell.adapter, outcome = ?cell.outcome, "cell graded");
            progress.cell_recorded(&cell);
            cells.push(cell);
        }

        CaseRow {
            artifact: artifact.to_path_buf(),
            cells,
            error: None,
        }
    }

    fn run_cell(
        &self,
        adapter: &dyn RuntimeAdapter,
        artifact: &Path,
        record: &ExpectationRecord,
        workspace: &CaseWorkspace,
    ) -> Cell {
        if let Err(err) = workspace.reset_scratch() {
            return Cell {
                adapter: adapter.name(),
                outcome: Outcome::Error,
                detail: Some(format!("{err:#}")),
            };
        }

        let invocation = InvocationDescriptor::from_record(record);
        match adapter.execute(artifact, &invocation, workspace) {
            Ok(result) => Cell {
                adapter: adapter.name(),
                outcome: grade(&result, record),
                detail: None,
            },
            Err(err) => Cell {
                adapter: adapter.name(),
                outcome: Outcome::Error,
                detail: Some(err.to_string()),
            },
        }
    }
}

impl CaseRow {
    fn aborted(artifact: &Path, message: String) -> Self {
        Self {
            artifact: artifact.to_path_buf(),
            cells: Vec::new(),
            error: Some(message),
        }
    }
}
