//! WasmEdge adapter: ahead-of-time compilation followed by native execution

use super::{run_with_deadline, AdapterError, ExecutionResult, InvocationDescriptor, RuntimeAdapter};
use crate::workspace::CaseWorkspace;
use std::path::{Path, PathBuf};
use std::process::Command;

pub struct WasmedgeAdapter;

impl WasmedgeAdapter {
    /// Compile the artifact to a native object in the scratch directory.
    /// This sub-step is part of `execute`; its failure is distinct from a
    /// runtime execution failure.
    fn compile(
        &self,
        artifact: &Path,
        invocation: &InvocationDescriptor,
        workspace: &CaseWorkspace,
    ) -> Result<PathBuf, AdapterError> {
        let stem = artifact
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "module".to_string());
        let object = workspace.scratch().join(format!("{stem}.so"));

        let mut command = Command::new("wasmedgec");
        command.arg(artifact).arg(&object);
        command.current_dir(workspace.root());

        let result = run_with_deadline(command, None, invocation.timeout)?;
        if result.timed_out {
            return Err(AdapterError::Compile {
                runtime: "wasmedge".to_string(),
                message: "wasmedgec timed out".to_string(),
            });
        }
        if result.exit_code != Some(0) {
            return Err(AdapterError::Compile {
                runtime: "wasmedge".to_string(),
                message: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        Ok(object)
    }

    fn command(&self, object: &Path, invocation: &InvocationDescriptor, workdir: &Path) -> Command {
        let mut command = Command::new("wasmedge");

        for (key, value) in &invocation.env {
            command.arg("--env").arg(format!("{key}={value}"));
        }

        for (guest, host) in &invocation.preopens {
            command.arg("--dir").arg(format!("{guest}:{host}"));
        }

        command.arg(object);

        // Guest args follow the object directly; wasmedge takes no `--`.
        for arg in &invocation.args {
            command.arg(arg);
        }

        command.current_dir(workdir);
        command
    }
}

impl RuntimeAdapter for WasmedgeAdapter {
    fn name(&self) -> &'static str {
        "wasmedge"
    }

    fn execute(
        &self,
        artifact: &Path,
        invocation: &InvocationDescriptor,
        workspace: &CaseWorkspace,
    ) -> Result<ExecutionResult, AdapterError> {
        let object = self.compile(artifact, invocation, workspace)?;
        let command = self.command(&object, invocation, workspace.root());
        run_with_deadline(command, invocation.stdin.as_deref(), invocation.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expectation::ExpectationRecord;
    use std::collections::BTreeMap;

    #[test]
    fn command_uses_dir_flag_and_appends_args_without_separator() {
        let record = ExpectationRecord {
            env: BTreeMap::from([("KEY".to_string(), "value".to_string())]),
            preopens: BTreeMap::from([("/data".to_string(), "/tmp/fixtures".to_string())]),
            args: vec!["a".to_string(), "b".to_string()],
            ..ExpectationRecord::default()
        };
        let invocation = InvocationDescriptor::from_record(&record);

        let command =
            WasmedgeAdapter.command(Path::new("/scratch/case.so"), &invocation, Path::new("/ws"));

        assert_eq!(command.get_program().to_string_lossy(), "wasmedge");
        let args: Vec<String> = command
            .get_args()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect();
        assert_eq!(
            args,
            vec![
                "--env",
                "KEY=value",
                "--dir",
                "/data:/tmp/fixtures",
                "/scratch/case.so",
                "a",
                "b",
            ]
        );
    }

    #[test]
    fn compile_failure_when_compiler_is_missing_is_a_launch_error() {
        let fixtures = tempfile::tempdir().unwrap();
        let workspace = CaseWorkspace::prepare(fixtures.path()).unwrap();
        let invocation = InvocationDescriptor::from_record(&ExpectationRecord::default());

        // Without wasmedgec on PATH the AOT sub-step cannot start at all.
        if which("wasmedgec") {
            return;
        }

        match WasmedgeAdapter.compile(Path::new("/build/case.wasm"), &invocation, &workspace) {
            Err(AdapterError::Launch { runtime, .. }) => assert_eq!(runtime, "wasmedgec"),
            other => panic!("expected Launch error, got {other:?}"),
        }
    }

    fn which(binary: &str) -> bool {
        std::env::var_os("PATH")
            .map(|paths| {
                std::env::split_paths(&paths).any(|dir| dir.join(binary).is_file())
            })
            .unwrap_or(false)
    }
}
