// src/exec/executor.rs

//! Group-by-group script execution.
//!
//! Groups run strictly one after another; members inside a group run on the
//! worker pool. A failed member never stops later groups.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::dag::OrderResult;
use crate::exec::outcome::{FailureKind, RunSummary, ScriptOutcome, ScriptResult, SkipReason};
use crate::exec::pool::WorkerPool;
use crate::exec::process::{shell_argv, ProcessOptions, ProcessRunner, ShellRunner};
use crate::exec::scripts::{build_command, ScriptSource};
use crate::report::Reporter;
use crate::workspace::WorkspaceMember;

/// What to run in each member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptInvocation {
    pub script: String,
    pub args: Vec<String>,
}

impl ScriptInvocation {
    pub fn new(script: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            script: script.into(),
            args,
        }
    }
}

/// Results of one pass over an [`OrderResult`].
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Per-group results, in group order; each group in member order.
    pub groups: Vec<Vec<ScriptResult>>,
    pub summary: RunSummary,
    pub duration: Duration,
}

impl RunReport {
    pub fn results(&self) -> impl Iterator<Item = &ScriptResult> {
        self.groups.iter().flatten()
    }

    pub fn exit_code(&self) -> i32 {
        self.summary.exit_code()
    }
}

pub struct ScriptExecutor {
    scripts: Arc<dyn ScriptSource>,
    runner: Arc<dyn ProcessRunner>,
    pool: WorkerPool,
    timeout: Option<Duration>,
}

impl ScriptExecutor {
    pub fn new(
        scripts: Arc<dyn ScriptSource>,
        runner: Arc<dyn ProcessRunner>,
        pool: WorkerPool,
    ) -> Self {
        Self {
            scripts,
            runner,
            pool,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run every group in order, reporting each result as its group ends.
    pub fn run_plan(
        &self,
        plan: &OrderResult,
        invocation: &ScriptInvocation,
        reporter: &mut dyn Reporter,
    ) -> RunReport {
        let started = Instant::now();
        let total = plan.parallel_groups.len();
        let mut report = RunReport::default();

        for (idx, group) in plan.parallel_groups.iter().enumerate() {
            if self.runner.is_stopping() {
                warn!(remaining = total - idx, "run interrupted; later groups not started");
                break;
            }
            reporter.group_started(idx, total, group);
            let results = self.run_group(group, invocation);
            for result in &results {
                report.summary.record(result);
                reporter.member_finished(result);
            }
            report.groups.push(results);
        }

        report.duration = started.elapsed();
        reporter.run_finished(&report.summary, report.duration);
        info!(
            script = %invocation.script,
            groups = total,
            success = report.summary.success,
            failed = report.summary.failed,
            skipped = report.summary.skipped,
            "run finished"
        );
        report
    }

    /// Run one group on the pool; results come back in `members` order.
    pub fn run_group(
        &self,
        members: &[WorkspaceMember],
        invocation: &ScriptInvocation,
    ) -> Vec<ScriptResult> {
        debug!(size = members.len(), workers = self.pool.size(), "running group");

        match self.pool.map(members, |m| self.run_member(m, invocation)) {
            Ok(slots) => slots
                .into_iter()
                .zip(members)
                .map(|(slot, member)| {
                    slot.unwrap_or_else(|| {
                        ScriptResult::failed(
                            &member.name,
                            FailureKind::Infrastructure("worker thread panicked".to_string()),
                        )
                    })
                })
                .collect(),
            Err(err) => {
                warn!(error = %err, "worker pool unavailable; failing whole group");
                members
                    .iter()
                    .map(|m| {
                        ScriptResult::failed(&m.name, FailureKind::Infrastructure(err.to_string()))
                    })
                    .collect()
            }
        }
    }

    /// Look up and run the script in one member.
    pub fn run_member(
        &self,
        member: &WorkspaceMember,
        invocation: &ScriptInvocation,
    ) -> ScriptResult {
        let table = match self.scripts.load(&member.abs_path) {
            Ok(Some(table)) => table,
            Ok(None) => {
                debug!(member = %member.name, "member has no scripts");
                return ScriptResult::skipped(&member.name, SkipReason::NoScripts);
            }
            Err(err) => {
                warn!(member = %member.name, error = %err, "could not read script table");
                let kind = FailureKind::ScriptTable(format!("{err:#}"));
                return ScriptResult::failed(&member.name, kind);
            }
        };

        let Some(command) = table.get(&invocation.script) else {
            debug!(member = %member.name, script = %invocation.script, "script not defined");
            return ScriptResult::skipped(&member.name, SkipReason::ScriptNotFound);
        };

        let command = build_command(command, &invocation.args);
        self.spawn(member, &command)
    }

    fn spawn(&self, member: &WorkspaceMember, command: &str) -> ScriptResult {
        info!(member = %member.name, cmd = %command, "starting script");

        let options = ProcessOptions {
            cwd: member.abs_path.clone(),
            timeout: self.timeout,
        };
        let started = Instant::now();
        let output = self.runner.run(&shell_argv(command), &options);
        let duration = started.elapsed();

        let output = match output {
            Ok(output) => output,
            Err(err) => {
                warn!(member = %member.name, error = %err, "failed to spawn script");
                let mut result =
                    ScriptResult::failed(&member.name, FailureKind::Spawn(err.to_string()));
                result.duration = duration;
                return result;
            }
        };

        let outcome = classify(output.exit_code, output.timed_out, self.timeout);
        info!(
            member = %member.name,
            exit_code = ?output.exit_code,
            timed_out = output.timed_out,
            elapsed_ms = duration.as_millis() as u64,
            "script exited"
        );

        ScriptResult {
            member_name: member.name.clone(),
            outcome,
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            duration,
        }
    }
}

fn classify(exit_code: Option<i32>, timed_out: bool, timeout: Option<Duration>) -> ScriptOutcome {
    if timed_out {
        return ScriptOutcome::Failed(FailureKind::TimedOut(timeout.unwrap_or_default()));
    }
    match exit_code {
        Some(0) => ScriptOutcome::Success,
        Some(code) => ScriptOutcome::Failed(FailureKind::ExitCode(code)),
        None => ScriptOutcome::Failed(FailureKind::Terminated),
    }
}

/// Executor wired to `package.json` scripts and real subprocesses.
///
/// Keep a clone of `runner` to interrupt the run from outside.
pub fn default_executor(
    pool: WorkerPool,
    timeout: Option<Duration>,
    runner: ShellRunner,
) -> ScriptExecutor {
    ScriptExecutor::new(
        Arc::new(crate::exec::scripts::PackageJsonScripts),
        Arc::new(runner),
        pool,
    )
    .with_timeout(timeout)
}
