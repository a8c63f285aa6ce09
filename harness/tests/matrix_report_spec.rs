use harness::adapter::{AdapterError, ExecutionResult, InvocationDescriptor, RuntimeAdapter};
use harness::matrix::{Cell, Matrix, Outcome, Progress, SilentProgress};
use harness::workspace::CaseWorkspace;
use harness::{persist_record, ExpectationRecord};
use std::fs;
use std::path::Path;

fn clean_result() -> ExecutionResult {
    ExecutionResult {
        stdout: Vec::new(),
        stderr: Vec::new(),
        exit_code: Some(0),
        timed_out: false,
    }
}

/// Adapter that always reports the same canned result.
struct StaticAdapter {
    name: &'static str,
    result: ExecutionResult,
}

impl RuntimeAdapter for StaticAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn execute(
        &self,
        _artifact: &Path,
        _invocation: &InvocationDescriptor,
        _workspace: &CaseWorkspace,
    ) -> Result<ExecutionResult, AdapterError> {
        Ok(self.result.clone())
    }
}

/// Adapter that breaks the way a harness malfunction would.
struct BrokenAdapter;

impl RuntimeAdapter for BrokenAdapter {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn execute(
        &self,
        _artifact: &Path,
        _invocation: &InvocationDescriptor,
        _workspace: &CaseWorkspace,
    ) -> Result<ExecutionResult, AdapterError> {
        Err(AdapterError::Runtime {
            message: "glue file unwritable".to_string(),
        })
    }
}

/// Adapter that fails unless the scratch directory was freshly reset, then
/// deliberately leaves litter behind for the next adapter to trip over.
struct ScratchProbe {
    name: &'static str,
}

impl RuntimeAdapter for ScratchProbe {
    fn name(&self) -> &'static str {
        self.name
    }

    fn execute(
        &self,
        _artifact: &Path,
        _invocation: &InvocationDescriptor,
        workspace: &CaseWorkspace,
    ) -> Result<ExecutionResult, AdapterError> {
        let leftovers = fs::read_dir(workspace.scratch())
            .map_err(|err| AdapterError::Runtime {
                message: err.to_string(),
            })?
            .count();
        if leftovers != 0 {
            return Err(AdapterError::Runtime {
                message: format!("scratch not reset, found {leftovers} entries"),
            });
        }

        fs::write(workspace.scratch().join("litter.txt"), b"leak").map_err(|err| {
            AdapterError::Runtime {
                message: err.to_string(),
            }
        })?;
        Ok(clean_result())
    }
}

/// Progress sink that records the order of callbacks.
#[derive(Default)]
struct RecordingProgress {
    events: Vec<String>,
}

impl Progress for RecordingProgress {
    fn case_started(&mut self, artifact: &Path) {
        self.events.push(format!("case {}", artifact.display()));
    }

    fn case_failed(&mut self, _artifact: &Path, _message: &str) {
        self.events.push("case-failed".to_string());
    }

    fn cell_recorded(&mut self, cell: &Cell) {
        self.events.push(format!("cell {} {:?}", cell.adapter, cell.outcome));
    }
}

fn write_artifact(root: &Path, name: &str, with_record: bool) {
    let artifact = root.join(name);
    fs::write(&artifact, b"\0asm").unwrap();
    if with_record {
        persist_record(&artifact, &ExpectationRecord::default()).unwrap();
    }
}

#[test]
fn adapter_error_is_an_error_cell_and_does_not_abort_the_case() {
    let dir = tempfile::tempdir().unwrap();
    write_artifact(dir.path(), "case.wasm", true);

    let adapters: Vec<Box<dyn RuntimeAdapter>> = vec![
        Box::new(StaticAdapter {
            name: "good",
            result: clean_result(),
        }),
        Box::new(BrokenAdapter),
        Box::new(StaticAdapter {
            name: "also-good",
            result: clean_result(),
        }),
    ];

    let matrix = Matrix::with_paths(adapters, dir.path(), dir.path().join("fixtures"));
    let report = matrix.run(&mut SilentProgress);

    assert_eq!(report.rows.len(), 1);
    let row = &report.rows[0];
    assert!(row.error.is_none());

    let outcomes: Vec<Outcome> = row.cells.iter().map(|cell| cell.outcome).collect();
    assert_eq!(outcomes, vec![Outcome::Pass, Outcome::Error, Outcome::Pass]);
    assert!(row.cells[1]
        .detail
        .as_deref()
        .unwrap()
        .contains("glue file unwritable"));
    assert!(!report.all_passed());
}

#[test]
fn unresolvable_artifact_aborts_only_its_own_row() {
    let dir = tempfile::tempdir().unwrap();
    write_artifact(dir.path(), "aa.wasm", true);
    write_artifact(dir.path(), "bb.wasm", false);
    write_artifact(dir.path(), "cc.wasm", true);

    let adapters: Vec<Box<dyn RuntimeAdapter>> = vec![Box::new(StaticAdapter {
        name: "good",
        result: clean_result(),
    })];

    let matrix = Matrix::with_paths(adapters, dir.path(), dir.path().join("fixtures"));
    let report = matrix.run(&mut SilentProgress);

    assert_eq!(report.rows.len(), 3);
    assert!(report.rows[0].error.is_none());
    assert!(report.rows[1].error.is_some(), "bb has no record");
    assert!(report.rows[1].cells.is_empty());
    assert!(report.rows[2].error.is_none(), "cc still runs after bb");
    assert!(!report.all_passed());
}

#[test]
fn ambiguous_record_lookup_aborts_the_row() {
    let dir = tempfile::tempdir().unwrap();
    write_artifact(dir.path(), "dup.wasm", true);
    let nested = dir.path().join("deeper");
    fs::create_dir(&nested).unwrap();
    fs::copy(dir.path().join("dup.json"), nested.join("dup.json")).unwrap();

    let adapters: Vec<Box<dyn RuntimeAdapter>> = vec![Box::new(StaticAdapter {
        name: "good",
        result: clean_result(),
    })];

    let matrix = Matrix::with_paths(adapters, dir.path(), dir.path().join("fixtures"));
    let report = matrix.run(&mut SilentProgress);

    assert_eq!(report.rows.len(), 1);
    assert!(report.rows[0].error.as_deref().unwrap().contains("found 2"));
}

#[test]
fn scratch_is_reset_before_every_adapter_run() {
    let dir = tempfile::tempdir().unwrap();
    write_artifact(dir.path(), "case.wasm", true);

    let adapters: Vec<Box<dyn RuntimeAdapter>> = vec![
        Box::new(ScratchProbe { name: "first" }),
        Box::new(ScratchProbe { name: "second" }),
    ];

    let matrix = Matrix::with_paths(adapters, dir.path(), dir.path().join("fixtures"));
    let report = matrix.run(&mut SilentProgress);

    let outcomes: Vec<Outcome> = report.rows[0].cells.iter().map(|cell| cell.outcome).collect();
    assert_eq!(
        outcomes,
        vec![Outcome::Pass, Outcome::Pass],
        "the second adapter must never see the first adapter's litter"
    );
}

#[test]
fn timed_out_execution_grades_fail_not_error() {
    let dir = tempfile::tempdir().unwrap();
    write_artifact(dir.path(), "slow.wasm", true);

    let adapters: Vec<Box<dyn RuntimeAdapter>> = vec![Box::new(StaticAdapter {
        name: "sluggish",
        result: ExecutionResult {
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: None,
            timed_out: true,
        },
    })];

    let matrix = Matrix::with_paths(adapters, dir.path(), dir.path().join("fixtures"));
    let report = matrix.run(&mut SilentProgress);

    assert_eq!(report.rows[0].cells[0].outcome, Outcome::Fail);
}

#[test]
fn progress_sees_cases_and_cells_in_stable_order() {
    let dir = tempfile::tempdir().unwrap();
    write_artifact(dir.path(), "bb.wasm", true);
    write_artifact(dir.path(), "aa.wasm", true);

    let adapters: Vec<Box<dyn RuntimeAdapter>> = vec![
        Box::new(StaticAdapter {
            name: "one",
            result: clean_result(),
        }),
        Box::new(StaticAdapter {
            name: "two",
            result: clean_result(),
        }),
    ];

    let matrix = Matrix::with_paths(adapters, dir.path(), dir.path().join("fixtures"));
    let mut progress = RecordingProgress::default();
    let report = matrix.run(&mut progress);

    assert!(report.all_passed());
    let expected = vec![
        format!("case {}", dir.path().join("aa.wasm").display()),
        "cell one Pass".to_string(),
        "cell two Pass".to_string(),
        format!("case {}", dir.path().join("bb.wasm").display()),
        "cell one Pass".to_string(),
        "cell two Pass".to_string(),
    ];
    assert_eq!(progress.events, expected);
}
