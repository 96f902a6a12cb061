// src/report.rs

//! User-facing progress output.
//!
//! The executor calls a [`Reporter`] as groups start and members finish.
//! [`ConsoleReporter`] prints one status line per member to stdout and keeps
//! tracing output on stderr out of the way.

use std::io::{self, Write};
use std::time::Duration;

use crate::exec::{RunSummary, ScriptOutcome, ScriptResult};
use crate::workspace::WorkspaceMember;

pub trait Reporter {
    fn group_started(&mut self, _index: usize, _total: usize, _members: &[WorkspaceMember]) {}

    fn member_finished(&mut self, result: &ScriptResult);

    fn run_finished(&mut self, _summary: &RunSummary, _elapsed: Duration) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn member_finished(&mut self, _result: &ScriptResult) {}
}

pub struct ConsoleReporter<W: Write> {
    out: W,
    verbose: bool,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout(verbose: bool) -> Self {
        Self::new(io::stdout(), verbose)
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, verbose: bool) -> Self {
        Self { out, verbose }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Write failures are ignored: a closed stdout must not abort the run.
    fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
    }

    fn indented(&mut self, text: &str) {
        for l in text.lines() {
            let _ = writeln!(self.out, "    {l}");
        }
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn group_started(&mut self, index: usize, total: usize, members: &[WorkspaceMember]) {
        if total > 1 {
            let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
            self.line(&format!("[{}/{}] {}", index + 1, total, names.join(", ")));
        }
    }

    fn member_finished(&mut self, result: &ScriptResult) {
        match &result.outcome {
            ScriptOutcome::Success => {
                self.line(&format!(
                    "✔ {} ({:.2}s)",
                    result.member_name,
                    result.duration.as_secs_f64()
                ));
                if self.verbose && !result.stdout.trim().is_empty() {
                    self.indented(result.stdout.trim_end());
                }
            }
            ScriptOutcome::Skipped(reason) => {
                self.line(&format!("- {} (skipped: {})", result.member_name, reason));
            }
            ScriptOutcome::Failed(kind) => {
                self.line(&format!("✘ {} ({})", result.member_name, kind));
                if self.verbose && !result.stdout.trim().is_empty() {
                    self.indented(result.stdout.trim_end());
                }
                if !result.stderr.trim().is_empty() {
                    self.indented(result.stderr.trim_end());
                }
            }
        }
    }

    fn run_finished(&mut self, summary: &RunSummary, elapsed: Duration) {
        self.line(&format!("{} in {:.2}s", summary, elapsed.as_secs_f64()));
        let _ = self.out.flush();
    }
}
