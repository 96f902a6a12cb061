// src/exec/mod.rs

//! Parallel script execution.
//!
//! - [`outcome`]: per-member results and the run summary.
//! - [`scripts`]: where script tables come from.
//! - [`process`]: subprocess spawning with captured output and timeouts.
//! - [`pool`]: the bounded worker pool used for one group.
//! - [`executor`]: ties the above together, group by group.

pub mod executor;
pub mod outcome;
pub mod pool;
pub mod process;
pub mod scripts;

pub use executor::{default_executor, RunReport, ScriptExecutor, ScriptInvocation};
pub use outcome::{FailureKind, RunSummary, ScriptOutcome, ScriptResult, SkipReason};
pub use pool::{PoolError, WorkerPool};
pub use process::{
    shell_argv, ProcessOptions, ProcessOutput, ProcessRunner, ShellRunner, StopSignal,
};
pub use scripts::{build_command, PackageJsonScripts, ScriptSource, ScriptTable};
