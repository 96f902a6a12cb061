// src/exec/outcome.rs

//! Per-member results and their aggregation.

use std::fmt;
use std::time::Duration;

use crate::workspace::MemberName;

/// Why a member was skipped instead of executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The member has no script table at all.
    NoScripts,
    /// The table exists but lacks the requested script.
    ScriptNotFound,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoScripts => f.write_str("no scripts defined"),
            SkipReason::ScriptNotFound => f.write_str("script not found"),
        }
    }
}

/// Why a member counts as failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The script exited with a non-zero code.
    ExitCode(i32),
    /// The process ended without an exit code (killed by a signal).
    Terminated,
    /// The per-script timeout expired and the process was killed.
    TimedOut(Duration),
    /// The shell could not be started.
    Spawn(String),
    /// The script table exists but could not be read.
    ScriptTable(String),
    /// The group's worker pool failed; the script never ran.
    Infrastructure(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::ExitCode(code) => write!(f, "exit code {code}"),
            FailureKind::Terminated => f.write_str("terminated by signal"),
            FailureKind::TimedOut(after) => {
                write!(f, "timed out after {:.1}s", after.as_secs_f64())
            }
            FailureKind::Spawn(err) => write!(f, "failed to start: {err}"),
            FailureKind::ScriptTable(err) => write!(f, "unreadable scripts: {err}"),
            FailureKind::Infrastructure(err) => write!(f, "not run: {err}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOutcome {
    Success,
    Skipped(SkipReason),
    Failed(FailureKind),
}

/// One execution outcome for one member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptResult {
    pub member_name: MemberName,
    pub outcome: ScriptOutcome,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Wall-clock time of the subprocess; zero when nothing ran.
    pub duration: Duration,
}

impl ScriptResult {
    pub fn skipped(member_name: impl Into<MemberName>, reason: SkipReason) -> Self {
        Self {
            member_name: member_name.into(),
            outcome: ScriptOutcome::Skipped(reason),
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::ZERO,
        }
    }

    /// A failure where no process output exists; the error text stands in
    /// for stderr.
    pub fn failed(member_name: impl Into<MemberName>, kind: FailureKind) -> Self {
        let stderr = match &kind {
            FailureKind::Spawn(err)
            | FailureKind::ScriptTable(err)
            | FailureKind::Infrastructure(err) => err.clone(),
            _ => String::new(),
        };
        Self {
            member_name: member_name.into(),
            outcome: ScriptOutcome::Failed(kind),
            exit_code: None,
            stdout: String::new(),
            stderr,
            duration: Duration::ZERO,
        }
    }

    pub fn success(&self) -> bool {
        self.outcome == ScriptOutcome::Success
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, ScriptOutcome::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, ScriptOutcome::Skipped(_))
    }
}

/// Success / failure / skip tallies, folded from results by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn from_results<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a ScriptResult>,
    {
        results.into_iter().fold(Self::default(), |mut acc, r| {
            acc.record(r);
            acc
        })
    }

    pub fn record(&mut self, result: &ScriptResult) {
        match result.outcome {
            ScriptOutcome::Success => self.success += 1,
            ScriptOutcome::Skipped(_) => self.skipped += 1,
            ScriptOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Skips alone never fail a run.
    pub fn exit_code(&self) -> i32 {
        if self.failed > 0 { 1 } else { 0 }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} failed, {} skipped",
            self.success, self.failed, self.skipped
        )
    }
}
