//! Wasmtime adapter: native runtime executable invoked directly

use super::{run_with_deadline, AdapterError, ExecutionResult, InvocationDescriptor, RuntimeAdapter};
use crate::workspace::CaseWorkspace;
use std::path::Path;
use std::process::Command;

pub struct WasmtimeAdapter;

impl WasmtimeAdapter {
    fn command(&self, artifact: &Path, invocation: &InvocationDescriptor, workdir: &Path) -> Command {
        let mut command = Command::new("wasmtime");
        command.arg("run");

        for (key, value) in &invocation.env {
            command.arg("--env").arg(format!("{key}={value}"));
        }

        // Double separator between guest and host path, unlike wasmer.
        for (guest, host) in &invocation.preopens {
            command.arg("--mapdir").arg(format!("{guest}::{host}"));
        }

        command.arg(artifact);

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

impl RuntimeAdapter for WasmtimeAdapter {
    fn name(&self) -> &'static str {
        "wasmtime"
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
