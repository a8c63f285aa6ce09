//! Conformance harness for wasm32-wasi runtime implementations
//!
//! Verifies that independent sandboxed runtimes execute the same compiled
//! module with identical externally observable behavior (stdout, stderr,
//! exit status) given identical environment, arguments, stdin and
//! filesystem exposure. Each test case carries its expectations as a JSON
//! annotation header in its source file; the build step compiles the case
//! and persists the record, and the matrix drives every built artifact
//! through every runtime adapter under timeout and isolation constraints.

pub mod adapter;
pub mod builder;
pub mod expectation;
pub mod matrix;
pub mod resolve;
pub mod workspace;

pub use adapter::{
    default_adapters, AdapterError, ExecutionResult, InvocationDescriptor, RuntimeAdapter,
};
pub use expectation::{extract, ExpectationError, ExpectationRecord};
pub use matrix::{grade, CaseRow, Cell, Matrix, MatrixReport, Outcome, Progress, SilentProgress};
pub use resolve::{persist_record, resolve_record, ResolveError};
pub use workspace::CaseWorkspace;
