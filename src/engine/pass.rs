// src/engine/pass.rs

use std::sync::Arc;

use crate::dag::OrderResult;
use crate::exec::{RunReport, RunSummary, ScriptExecutor, ScriptInvocation};
use crate::report::ConsoleReporter;
use crate::watch::{changed_members, ChangeEvent, ExecutionPass};

/// Runs a plan through the executor and prints status lines to stdout.
pub struct ConsolePass {
    executor: Arc<ScriptExecutor>,
    invocation: ScriptInvocation,
    verbose: bool,
}

impl ConsolePass {
    pub fn new(executor: Arc<ScriptExecutor>, invocation: ScriptInvocation, verbose: bool) -> Self {
        Self {
            executor,
            invocation,
            verbose,
        }
    }

    pub fn run_report(&self, plan: &OrderResult) -> RunReport {
        let mut reporter = ConsoleReporter::stdout(self.verbose);
        self.executor.run_plan(plan, &self.invocation, &mut reporter)
    }
}

impl ExecutionPass for ConsolePass {
    fn announce(&self, events: &[ChangeEvent], plan: &OrderResult) {
        println!();
        println!(
            "Changes in {}; re-running '{}' in {} member(s)",
            changed_members(events).join(", "),
            self.invocation.script,
            plan.member_count()
        );
    }

    fn run(&self, plan: &OrderResult) -> RunSummary {
        self.run_report(plan).summary
    }
}
