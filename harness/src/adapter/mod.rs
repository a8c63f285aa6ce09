//! Runtime adapter contract and the shared deadline-bounded process runner

use crate::expectation::ExpectationRecord;
use crate::workspace::CaseWorkspace;
use serde_json::json;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use wait_timeout::ChildExt;

pub mod deno;
pub mod node;
pub mod wasmedge;
pub mod wasmer;
pub mod wasmtime;

pub use deno::DenoAdapter;
pub use node::NodeAdapter;
pub use wasmedge::WasmedgeAdapter;
pub use wasmer::WasmerAdapter;
pub use wasmtime::WasmtimeAdapter;

/// Runtime-agnostic execution request for one adapter invocation.
///
/// Derived fresh from the record for every invocation; adapters translate it
/// into their native flag syntax and never mutate the record itself.
#[derive(Debug, Clone)]
pub struct InvocationDescriptor {
    pub stdin: Option<String>,
    pub env: BTreeMap<String, String>,
    pub args: Vec<String>,
    pub preopens: BTreeMap<String, String>,
    pub timeout: Duration,
}

impl InvocationDescriptor {
    pub fn from_record(record: &ExpectationRecord) -> Self {
        Self {
            stdin: record.stdin.clone(),
            env: record.env.clone(),
            args: record.args.clone(),
            preopens: record.preopens.clone(),
            timeout: Duration::from_secs_f64(record.timeout),
        }
    }

    /// Configuration JSON handed to interpreter glue programs. Collections
    /// are always present, never null, so the glue needs no fallbacks.
    pub fn glue_config(&self) -> String {
        json!({
            "env": self.env,
            "args": self.args,
            "preopens": self.preopens,
        })
        .to_string()
    }
}

/// Raw observable outcome of one adapter invocation. Output bytes are
/// captured without any transformation; `exit_code` is `None` when the child
/// died to a signal, including the harness's own timeout kill.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("failed to launch {runtime}: {source}")]
    Launch {
        runtime: String,
        source: std::io::Error,
    },

    #[error("{runtime} ahead-of-time compilation failed: {message}")]
    Compile { runtime: String, message: String },

    #[error("adapter failure: {message}")]
    Runtime { message: String },
}

/// Execution backend for one sandboxed runtime.
///
/// Implementations must name the artifact as the guest program with extra
/// args appended after it, translate env and preopens into native syntax,
/// and report a timeout instead of hanging the case. A guest program's own
/// nonzero exit is a successful `ExecutionResult`, not an error.
pub trait RuntimeAdapter {
    fn name(&self) -> &'static str;

    fn execute(
        &self,
        artifact: &Path,
        invocation: &InvocationDescriptor,
        workspace: &CaseWorkspace,
    ) -> Result<ExecutionResult, AdapterError>;
}

/// All five adapters in their declared matrix order.
pub fn default_adapters() -> Vec<Box<dyn RuntimeAdapter>> {
    vec![
        Box::new(DenoAdapter),
        Box::new(NodeAdapter),
        Box::new(WasmerAdapter),
        Box::new(WasmtimeAdapter),
        Box::new(WasmedgeAdapter),
    ]
}

/// Run a prepared command, racing it against the deadline.
///
/// The child is spawned with piped stdio; stdin is fed from a writer thread
/// and both output streams drain through reader threads so a full pipe can
/// never wedge the child. On deadline expiry the child is killed and the
/// result carries `timed_out = true`.
pub(crate) fn run_with_deadline(
    mut command: Command,
    stdin: Option<&str>,
    timeout: Duration,
) -> Result<ExecutionResult, AdapterError> {
    command.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let runtime = command.get_program().to_string_lossy().to_string();
    debug!(%runtime, ?timeout, "spawning runtime process");

    let mut child = command.spawn().map_err(|source| AdapterError::Launch {
        runtime: runtime.clone(),
        source,
    })?;

    let stdin_thread = match (stdin, child.stdin.take()) {
        (Some(input), Some(mut handle)) => {
            let input = input.to_string();
            Some(thread::spawn(move || {
                // A guest that exits without reading stdin breaks the pipe;
                // that shows up in grading, not as a harness failure.
                let _ = handle.write_all(input.as_bytes());
            }))
        }
        _ => None,
    };

    let stdout_thread = spawn_reader(child.stdout.take());
    let stderr_thread = spawn_reader(child.stderr.take());

    let (exit_code, timed_out) = match child.wait_timeout(timeout).map_err(|err| {
        AdapterError::Runtime {
            message: format!("failed waiting for {runtime}: {err}"),
        }
    })? {
        Some(status) => (status.code(), false),
        None => {
            let _ = child.kill();
            let _ = child.wait();
            debug!(%runtime, "killed runtime process after deadline");
            (None, true)
        }
    };

    if let Some(thread) = stdin_thread {
        let _ = thread.join();
    }
    let stdout = join_reader(stdout_thread, "stdout")?;
    let stderr = join_reader(stderr_thread, "stderr")?;

    Ok(ExecutionResult {
        stdout,
        stderr,
        exit_code,
        timed_out,
    })
}

fn spawn_reader<R: Read + Send + 'static>(
    pipe: Option<R>,
) -> thread::JoinHandle<std::io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buffer)?;
        }
        Ok(buffer)
    })
}

fn join_reader(
    handle: thread::JoinHandle<std::io::Result<Vec<u8>>>,
    stream: &str,
) -> Result<Vec<u8>, AdapterError> {
    handle
        .join()
        .map_err(|_| AdapterError::Runtime {
            message: format!("{stream} reader thread panicked"),
        })?
        .map_err(|err| AdapterError::Runtime {
            message: format!("failed to drain {stream}: {err}"),
        })
}
