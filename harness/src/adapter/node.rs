//! Node adapter: routes execution through a generated JavaScript glue program

use super::{run_with_deadline, AdapterError, ExecutionResult, InvocationDescriptor, RuntimeAdapter};
use crate::workspace::CaseWorkspace;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Glue program executed by the Node interpreter. Same contract as the Deno
/// glue: the guest argv is `[artifactPath, ...args]` and env/preopens come
/// from the config argument.
const GLUE: &str = r#"const fs = require("fs");
const { WASI } = require("wasi");

const config = JSON.parse(process.argv[2]);
const buffer = fs.readFileSync(process.argv[3]);

const wasi = new WASI({
  env: config.env,
  args: [process.argv[3], ...config.args],
  preopens: config.preopens,
});

WebAssembly.instantiate(buffer, {
  wasi_snapshot_preview1: wasi.wasiImport,
}).then(function ({ instance }) {
  wasi.start(instance);
});
"#;

pub struct NodeAdapter;

impl NodeAdapter {
    fn write_glue(&self, workspace: &CaseWorkspace) -> Result<PathBuf, AdapterError> {
        let path = workspace.scratch().join("glue.node.js");
        fs::write(&path, GLUE).map_err(|err| AdapterError::Runtime {
            message: format!("failed to write node glue program: {err}"),
        })?;
        Ok(path)
    }

    fn command(
        &self,
        artifact: &Path,
        invocation: &InvocationDescriptor,
        glue: &Path,
        workdir: &Path,
    ) -> Command {
        let mut command = Command::new("node");
        command
            .arg("--no-warnings")
            .arg("--experimental-wasi-unstable-preview1")
            .arg("--experimental-wasm-bigint");
        command.arg(glue);
        command.arg(invocation.glue_config());
        command.arg(artifact);
        command.current_dir(workdir);
        command
    }
}

impl RuntimeAdapter for NodeAdapter {
    fn name(&self) -> &'static str {
        "node"
    }

    fn execute(
        &self,
        artifact: &Path,
        invocation: &InvocationDescriptor,
        workspace: &CaseWorkspace,
    ) -> Result<ExecutionResult, AdapterError> {
        let glue = self.write_glue(workspace)?;
        let command = self.command(artifact, invocation, &glue, workspace.root());
        run_with_deadline(command, invocation.stdin.as_deref(), invocation.timeout)
    }
}
