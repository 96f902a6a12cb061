// src/exec/process.rs

//! Subprocess execution with captured output and an optional timeout.

use std::collections::BTreeSet;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

/// How often a timed child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long to wait for output pipes to close after a kill.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub cwd: PathBuf,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

/// Runs an argv to completion and captures both output streams.
///
/// `Err` is reserved for failing to start the process at all; a non-zero exit
/// is a normal `Ok` output.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, argv: &[&str], options: &ProcessOptions) -> io::Result<ProcessOutput>;

    /// `true` once the run has been interrupted; no new group should start.
    fn is_stopping(&self) -> bool {
        false
    }
}

/// Production runner backed by `std::process`.
///
/// Every script runs in its own process group, so a terminal Ctrl-C does not
/// reach it directly. Clones share the set of live groups; [`interrupt_all`]
/// forwards the signal to them and refuses further spawns.
///
/// [`interrupt_all`]: ShellRunner::interrupt_all
#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
    live: Arc<Mutex<LiveGroups>>,
}

#[derive(Debug, Default)]
struct LiveGroups {
    stopping: bool,
    pids: BTreeSet<u32>,
}

/// Signal sent to live process groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    Interrupt,
    Kill,
}

impl StopSignal {
    fn flag(self) -> &'static str {
        match self {
            StopSignal::Interrupt => "-INT",
            StopSignal::Kill => "-KILL",
        }
    }
}

impl ShellRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send `signal` to every running script's process group and refuse new
    /// spawns from now on. Returns how many groups were signalled.
    pub fn interrupt_all(&self, signal: StopSignal) -> usize {
        let mut live = self.lock();
        live.stopping = true;
        for &pid in &live.pids {
            if !signal_group(pid, signal) {
                debug!(pid, ?signal, "could not signal process group");
            }
        }
        live.pids.len()
    }

    fn lock(&self) -> MutexGuard<'_, LiveGroups> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn(&self, cmd: &mut Command) -> io::Result<Child> {
        let mut live = self.lock();
        if live.stopping {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "run interrupted"));
        }
        let child = cmd.spawn()?;
        live.pids.insert(child.id());
        Ok(child)
    }

    fn release(&self, pid: u32) {
        self.lock().pids.remove(&pid);
    }

    #[cfg(test)]
    fn live_count(&self) -> usize {
        self.lock().pids.len()
    }
}

/// Build the argv that runs `command` through the platform shell.
pub fn shell_argv(command: &str) -> [&str; 3] {
    if cfg!(windows) {
        ["cmd", "/C", command]
    } else {
        ["sh", "-c", command]
    }
}

impl ProcessRunner for ShellRunner {
    fn is_stopping(&self) -> bool {
        self.lock().stopping
    }

    fn run(&self, argv: &[&str], options: &ProcessOptions) -> io::Result<ProcessOutput> {
        let (program, rest) = argv
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty argv"))?;

        let mut cmd = Command::new(program);
        cmd.args(rest)
            .current_dir(&options.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own process group so a timeout can take down the whole script tree.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = self.spawn(&mut cmd)?;
        let pid = child.id();
        debug!(pid, program = %program, "spawned process");

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let waited = match options.timeout {
            None => child.wait().map(|status| (Some(status), false)),
            Some(limit) => wait_with_timeout(&mut child, limit),
        };
        self.release(pid);
        let (status, timed_out) = waited?;

        // After a signal, orphaned grandchildren may keep the pipes open.
        let signalled = status.is_some_and(|s| s.code().is_none());
        let grace = (timed_out || signalled).then_some(DRAIN_GRACE);
        Ok(ProcessOutput {
            exit_code: status.and_then(|s| s.code()),
            stdout: collect(stdout, grace),
            stderr: collect(stderr, grace),
            timed_out,
        })
    }
}

fn wait_with_timeout(
    child: &mut Child,
    limit: Duration,
) -> io::Result<(Option<ExitStatus>, bool)> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((Some(status), false));
        }
        if started.elapsed() >= limit {
            kill_tree(child);
            let status = child.wait().ok();
            return Ok((status, true));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn kill_tree(child: &mut Child) {
    if signal_group(child.id(), StopSignal::Kill) {
        return;
    }
    debug!(pid = child.id(), "process-group kill failed; killing shell only");
    if let Err(err) = child.kill() {
        warn!(pid = child.id(), error = %err, "failed to kill timed-out process");
    }
}

/// Signal the process group led by `pid`. Returns `false` if that failed.
#[cfg(unix)]
fn signal_group(pid: u32, signal: StopSignal) -> bool {
    let group = format!("-{pid}");
    Command::new("kill")
        .args([signal.flag(), "--", &group])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

#[cfg(not(unix))]
fn signal_group(_pid: u32, _signal: StopSignal) -> bool {
    false
}

fn drain<R>(pipe: Option<R>) -> Option<mpsc::Receiver<String>>
where
    R: Read + Send + 'static,
{
    let mut pipe = pipe?;
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    Some(rx)
}

fn collect(rx: Option<mpsc::Receiver<String>>, grace: Option<Duration>) -> String {
    let Some(rx) = rx else {
        return String::new();
    };
    match grace {
        Some(grace) => rx.recv_timeout(grace).unwrap_or_default(),
        None => rx.recv().unwrap_or_default(),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn opts(timeout: Option<Duration>) -> ProcessOptions {
        ProcessOptions {
            cwd: std::env::temp_dir(),
            timeout,
        }
    }

    #[test]
    fn captures_both_streams_and_exit_code() {
        let out = ShellRunner::new()
            .run(&shell_argv("echo out; echo err >&2; exit 3"), &opts(None))
            .unwrap();
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
        assert!(!out.timed_out);
    }

    #[test]
    fn runs_in_requested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let options = ProcessOptions {
            cwd: dir.path().to_path_buf(),
            timeout: None,
        };
        let out = ShellRunner::new().run(&shell_argv("pwd"), &options).unwrap();
        let reported = std::fs::canonicalize(out.stdout.trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[test]
    fn timeout_kills_the_process() {
        let started = Instant::now();
        let out = ShellRunner::new()
            .run(&shell_argv("sleep 5"), &opts(Some(Duration::from_millis(100))))
            .unwrap();
        assert!(out.timed_out);
        assert_ne!(out.exit_code, Some(0));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn interrupt_stops_running_scripts_and_later_spawns() {
        let runner = ShellRunner::new();
        let worker = {
            let runner = runner.clone();
            thread::spawn(move || runner.run(&shell_argv("sleep 5"), &opts(None)))
        };

        let deadline = Instant::now() + Duration::from_secs(3);
        while runner.live_count() == 0 {
            assert!(Instant::now() < deadline, "script never started");
            thread::sleep(Duration::from_millis(10));
        }
        let started = Instant::now();
        assert_eq!(runner.interrupt_all(StopSignal::Interrupt), 1);

        let out = worker.join().unwrap().unwrap();
        assert_ne!(out.exit_code, Some(0));
        assert!(!out.timed_out);
        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(runner.live_count(), 0);

        assert!(runner.is_stopping());
        let err = runner.run(&shell_argv("true"), &opts(None)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Interrupted);
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let err = ShellRunner::new()
            .run(&["/definitely/not/a/program"], &opts(None))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
