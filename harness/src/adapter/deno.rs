//! Deno adapter: routes execution through a generated TypeScript glue program

use super::{run_with_deadline, AdapterError, ExecutionResult, InvocationDescriptor, RuntimeAdapter};
use crate::workspace::CaseWorkspace;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Glue program executed by the Deno interpreter. It builds the guest WASI
/// environment itself: argv is `[artifactPath, ...args]`, env and preopens
/// come from the config argument and are never null.
const GLUE: &str = r#"import WASI from "https://deno.land/std/wasi/snapshot_preview1.ts";

const config = JSON.parse(Deno.args[0]);
const buffer = Deno.readFileSync(Deno.args[1]);

const wasi = new WASI({
  env: config.env,
  args: [Deno.args[1], ...config.args],
  preopens: config.preopens,
});

WebAssembly.instantiate(buffer, {
  wasi_snapshot_preview1: wasi.exports,
}).then(function ({ instance }) {
  wasi.start(instance);
});
"#;

pub struct DenoAdapter;

impl DenoAdapter {
    fn write_glue(&self, workspace: &CaseWorkspace) -> Result<PathBuf, AdapterError> {
        let path = workspace.scratch().join("glue.deno.ts");
        fs::write(&path, GLUE).map_err(|err| AdapterError::Runtime {
            message: format!("failed to write deno glue program: {err}"),
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
        let mut command = Command::new("deno");
        command
            .arg("run")
            .arg("--quiet")
            .arg("--allow-all")
            .arg("--unstable");
        command.arg(glue);
        command.arg(invocation.glue_config());
        command.arg(artifact);
        command.current_dir(workdir);
        command
    }
}

impl RuntimeAdapter for DenoAdapter {
    fn name(&self) -> &'static str {
        "deno"
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
