//! Wasmer adapter: native runtime executable invoked directly

use super::{run_with_deadline, AdapterError, ExecutionResult, InvocationDescriptor, RuntimeAdapter};
use crate::workspace::CaseWorkspace;
use std::path::Path;
use std::process::Command;

pub struct WasmerAdapter;

impl WasmerAdapter {
    fn command(&self, artifact: &Path, invocation: &InvocationDescriptor, workdir: &Path) -> Command {
        let mut command = Command::new("wasmer");
        command.arg("run").arg(artifact);

        for (key, value) in &invocation.env {
            command.arg("--env").arg(format!("{key}={value}"));
        }

        // Wasmer's mapdir flag uses a single separator between guest and
        // host path. Wasmtime uses two; the distinction is a hard contract.
        for (guest, host) in &invocation.preopens {
            command.arg("--mapdir").arg(format!("{guest}:{host}"));
        }

        if !invocation.args.is_empty() {
            command.arg("--");
            for arg in &invocation.args {
                command.arg(arg);
            }
        }

        command.current_dir(workdir);
        command
    }
}

impl RuntimeAdapter for WasmerAdapter {
    fn name(&self) -> &'static str {
        "wasmer"
    }

    fn execute(
        &self,
        artifact: &Path,
        invocation: &InvocationDescriptor,
        workspace: &CaseWorkspace,
    ) -> Result<ExecutionResult, AdapterError> {
        let command = self.command(artifact, invocation, workspace.root());
        run_with_deadline(command, invocation.stdin.as_deref(), invocation.timeout)
    }
}
