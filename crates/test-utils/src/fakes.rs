#![allow(dead_code)]

//! In-memory collaborators for executor, selector and watcher tests.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use wsrun::dag::OrderResult;
use wsrun::errors::Result;
use wsrun::exec::{
    ProcessOptions, ProcessOutput, ProcessRunner, RunSummary, ScriptSource, ScriptTable,
};
use wsrun::select::{ChangeDetector, ChangeOptions};
use wsrun::watch::{ChangeEvent, ExecutionPass};
use wsrun::workspace::WorkspaceMember;

/// One recorded process invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub cwd: PathBuf,
    pub command: String,
    pub started: Instant,
    pub finished: Instant,
}

#[derive(Debug, Clone)]
enum Behaviour {
    Exit(i32),
    SpawnError,
    TimeOut,
}

/// `ProcessRunner` that never spawns anything.
///
/// Commands succeed unless a rule whose needle is contained in the command
/// says otherwise. Every call sleeps `delay` so overlaps are observable.
pub struct FakeRunner {
    rules: Vec<(String, Behaviour)>,
    delay: Duration,
    calls: Mutex<Vec<Invocation>>,
    active: AtomicUsize,
    peak: AtomicUsize,
    stop_on: Option<String>,
    stopping: AtomicBool,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            delay: Duration::from_millis(5),
            calls: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            stop_on: None,
            stopping: AtomicBool::new(false),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn exit_with(mut self, needle: &str, code: i32) -> Self {
        self.rules.push((needle.to_string(), Behaviour::Exit(code)));
        self
    }

    pub fn fail_to_spawn(mut self, needle: &str) -> Self {
        self.rules.push((needle.to_string(), Behaviour::SpawnError));
        self
    }

    pub fn time_out(mut self, needle: &str) -> Self {
        self.rules.push((needle.to_string(), Behaviour::TimeOut));
        self
    }

    /// Behave as if the run was interrupted while a command containing
    /// `needle` was running.
    pub fn interrupt_during(mut self, needle: &str) -> Self {
        self.stop_on = Some(needle.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    /// The recorded call that ran in `dir`.
    pub fn call_in(&self, dir: &Path) -> Option<Invocation> {
        self.calls().into_iter().find(|c| c.cwd == dir)
    }

    /// Highest number of overlapping calls seen.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn behaviour(&self, command: &str) -> Behaviour {
        self.rules
            .iter()
            .find(|(needle, _)| command.contains(needle.as_str()))
            .map(|(_, b)| b.clone())
            .unwrap_or(Behaviour::Exit(0))
    }
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner for FakeRunner {
    fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    fn run(&self, argv: &[&str], options: &ProcessOptions) -> io::Result<ProcessOutput> {
        let command = argv.last().copied().unwrap_or_default().to_string();
        let behaviour = self.behaviour(&command);
        if let Behaviour::SpawnError = behaviour {
            return Err(io::Error::new(io::ErrorKind::NotFound, "sh: not found"));
        }

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let started = Instant::now();
        thread::sleep(self.delay);
        let finished = Instant::now();
        self.active.fetch_sub(1, Ordering::SeqCst);
        if self.stop_on.as_deref().is_some_and(|needle| command.contains(needle)) {
            self.stopping.store(true, Ordering::SeqCst);
        }

        self.calls.lock().unwrap().push(Invocation {
            cwd: options.cwd.clone(),
            command: command.clone(),
            started,
            finished,
        });

        Ok(match behaviour {
            Behaviour::Exit(code) => ProcessOutput {
                exit_code: Some(code),
                stdout: format!("ran: {command}\n"),
                stderr: if code == 0 { String::new() } else { format!("{command} failed\n") },
                timed_out: false,
            },
            Behaviour::TimeOut => ProcessOutput {
                exit_code: None,
                stdout: String::new(),
                stderr: String::new(),
                timed_out: true,
            },
            Behaviour::SpawnError => unreachable!("handled above"),
        })
    }
}

/// `ScriptSource` backed by a map from member directory to script table.
#[derive(Default)]
pub struct FakeScripts {
    tables: BTreeMap<PathBuf, Option<ScriptTable>>,
}

impl FakeScripts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, dir: impl Into<PathBuf>, scripts: &[(&str, &str)]) -> Self {
        let table = scripts
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.tables.insert(dir.into(), Some(table));
        self
    }

    pub fn without_scripts(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tables.insert(dir.into(), None);
        self
    }
}

impl ScriptSource for FakeScripts {
    fn load(&self, member_dir: &Path) -> anyhow::Result<Option<ScriptTable>> {
        match self.tables.get(member_dir) {
            Some(table) => Ok(table.clone()),
            None => anyhow::bail!("no manifest registered for {}", member_dir.display()),
        }
    }
}

/// `ChangeDetector` reporting a fixed set of member names as changed.
pub struct FixedChangeDetector {
    changed: Vec<String>,
}

impl FixedChangeDetector {
    pub fn new(changed: &[&str]) -> Self {
        Self {
            changed: changed.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ChangeDetector for FixedChangeDetector {
    fn detect(
        &self,
        _root: &Path,
        candidates: &[WorkspaceMember],
        _options: &ChangeOptions,
    ) -> Result<Vec<WorkspaceMember>> {
        Ok(candidates
            .iter()
            .filter(|m| self.changed.contains(&m.name))
            .cloned()
            .collect())
    }
}

/// `ExecutionPass` that records the members of every plan it is given.
#[derive(Default)]
pub struct RecordingPass {
    plans: Mutex<Vec<Vec<String>>>,
    announced: Mutex<Vec<Vec<String>>>,
}

impl RecordingPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> Vec<Vec<String>> {
        self.plans.lock().unwrap().clone()
    }

    pub fn run_count(&self) -> usize {
        self.plans.lock().unwrap().len()
    }

    /// Member names reported changed, one entry per trigger.
    pub fn announced(&self) -> Vec<Vec<String>> {
        self.announced.lock().unwrap().clone()
    }
}

impl ExecutionPass for RecordingPass {
    fn announce(&self, events: &[ChangeEvent], _plan: &OrderResult) {
        let names = wsrun::watch::changed_members(events);
        self.announced.lock().unwrap().push(names);
    }

    fn run(&self, plan: &OrderResult) -> RunSummary {
        let names: Vec<String> = plan.order.iter().map(|m| m.name.clone()).collect();
        let success = names.len();
        self.plans.lock().unwrap().push(names);
        RunSummary {
            success,
            failed: 0,
            skipped: 0,
        }
    }
}
