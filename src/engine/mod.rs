// src/engine/mod.rs

//! Orchestration of one `wsrun` invocation.
//!
//! - [`pipeline`] turns a [`RunRequest`] into an execution plan: load the
//!   workspace, resolve the filter, narrow to changed members, order.
//! - [`pass`] executes a plan and reports it to the console; the same pass
//!   is reused for every watch-triggered re-run.

pub mod pass;
pub mod pipeline;

use std::path::PathBuf;

use crate::dag::OrderResult;
use crate::exec::ScriptInvocation;
use crate::select::ChangeOptions;
use crate::workspace::{Workspace, WorkspaceMember};

pub use pass::ConsolePass;
pub use pipeline::Pipeline;

/// Everything needed to decide what to run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub root: PathBuf,
    pub filter: Option<String>,
    /// `false` puts every selected member in one group.
    pub ordered: bool,
    /// `Some` restricts the selection to members changed since a ref.
    pub changed: Option<ChangeOptions>,
    pub invocation: ScriptInvocation,
}

/// A plan ready to execute.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub workspace: Workspace,
    pub selected: Vec<WorkspaceMember>,
    pub plan: OrderResult,
}

/// Result of planning.
#[derive(Debug, Clone)]
pub enum Prepared {
    Ready(PreparedRun),
    /// Selection came up empty; exit cleanly with this message.
    NothingToDo(String),
}
