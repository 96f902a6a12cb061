// src/watch/watcher.rs

//! The watch loop.
//!
//! ```text
//! Idle -> Scanning -> (no change) sleep poll_interval -> Scanning
//!                  -> (change) Debouncing -> Triggered -> Executing -> Idle
//! ```
//!
//! Scans and execution passes run on the blocking pool. The shutdown future
//! is only observed while sleeping, so a pass that has started always
//! finishes.
//!
//! The baseline is the snapshot a pass was triggered from, so edits made
//! while a pass runs trigger the next one. Build output has to be kept out
//! with `exclude` globs or it retriggers too.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::WatchSettings;
use crate::dag::{MemberGraph, OrderResult};
use crate::exec::RunSummary;
use crate::types::RerunScope;
use crate::watch::snapshot::{changed_members, diff, scan, ChangeEvent, ScanOptions, Snapshot};
use crate::workspace::{MemberDependencies, WorkspaceMember};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Scanning,
    Debouncing,
    Triggered,
    Executing,
}

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub poll_interval: Duration,
    pub debounce: Duration,
    pub rerun: RerunScope,
    pub exclude: Vec<String>,
    pub use_hash: bool,
}

impl From<&WatchSettings> for WatchOptions {
    fn from(settings: &WatchSettings) -> Self {
        Self {
            poll_interval: settings.poll_interval,
            debounce: settings.debounce,
            rerun: settings.rerun,
            exclude: settings.exclude.clone(),
            use_hash: settings.use_hash,
        }
    }
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self::from(&WatchSettings::default())
    }
}

/// One execution pass triggered by the watcher.
pub trait ExecutionPass: Send + Sync + 'static {
    /// Called once per trigger, before the pass runs.
    fn announce(&self, _events: &[ChangeEvent], _plan: &OrderResult) {}

    fn run(&self, plan: &OrderResult) -> RunSummary;
}

/// What the loop did before it was stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchReport {
    pub passes: usize,
    pub last_summary: Option<RunSummary>,
}

pub struct Watcher {
    members: Arc<Vec<WorkspaceMember>>,
    graph: MemberGraph,
    plan: OrderResult,
    rerun: RerunScope,
    poll_interval: Duration,
    debounce: Duration,
    scan_options: Arc<ScanOptions>,
    baseline: Option<Snapshot>,
    state: WatchState,
}

impl Watcher {
    /// `plan` is the full plan for the selected members; affected-only
    /// re-runs are carved out of it.
    pub fn new(
        members: Vec<WorkspaceMember>,
        deps: &MemberDependencies,
        plan: OrderResult,
        options: &WatchOptions,
    ) -> Result<Self> {
        let scan_options = ScanOptions::new(&options.exclude, options.use_hash)?;
        Ok(Self {
            graph: MemberGraph::build(&members, deps),
            members: Arc::new(members),
            plan,
            rerun: options.rerun,
            poll_interval: options.poll_interval,
            debounce: options.debounce,
            scan_options: Arc::new(scan_options),
            baseline: None,
            state: WatchState::Idle,
        })
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// The plan a trigger with `events` runs, according to the re-run scope.
    pub fn plan_for(&self, events: &[ChangeEvent]) -> OrderResult {
        match self.rerun {
            RerunScope::All => self.plan.clone(),
            RerunScope::Affected => {
                let changed = changed_members(events);
                let affected = self.graph.with_dependents(changed.iter().map(String::as_str));
                self.plan.retain(|m| affected.contains(&m.name))
            }
        }
    }

    /// Take the baseline, then run the whole plan once.
    ///
    /// Changes made while this pass runs are picked up by [`Watcher::run`].
    pub async fn run_initial(&mut self, pass: &Arc<dyn ExecutionPass>) -> Result<RunSummary> {
        self.state = WatchState::Scanning;
        self.baseline = Some(self.scan(None).await?);

        self.state = WatchState::Executing;
        let pass = Arc::clone(pass);
        let plan = self.plan.clone();
        let summary = tokio::task::spawn_blocking(move || pass.run(&plan))
            .await
            .context("execution pass panicked")?;
        self.state = WatchState::Idle;
        Ok(summary)
    }

    /// Poll until `shutdown` resolves.
    ///
    /// Without a prior [`Watcher::run_initial`] the baseline is taken here,
    /// and only changes made after it count.
    pub async fn run<S>(mut self, pass: Arc<dyn ExecutionPass>, shutdown: S) -> Result<WatchReport>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut report = WatchReport::default();

        self.state = WatchState::Scanning;
        let mut baseline = match self.baseline.take() {
            Some(baseline) => baseline,
            None => self.scan(None).await?,
        };
        info!(
            members = self.members.len(),
            files = baseline.len(),
            rerun = %self.rerun,
            "watching for changes"
        );

        loop {
            self.state = WatchState::Idle;
            tokio::select! {
                _ = &mut shutdown => break,
                _ = sleep(self.poll_interval) => {}
            }

            self.state = WatchState::Scanning;
            let current = self.scan(Some(&baseline)).await?;
            let events = diff(&baseline, &current, &self.members);
            if events.is_empty() {
                baseline = current;
                continue;
            }
            debug!(events = events.len(), "changes detected; debouncing");

            self.state = WatchState::Debouncing;
            tokio::select! {
                _ = &mut shutdown => break,
                _ = sleep(self.debounce) => {}
            }
            let settled = self.scan(Some(&current)).await?;
            let events = diff(&baseline, &settled, &self.members);
            if events.is_empty() {
                debug!("changes cancelled out during debounce");
                baseline = settled;
                continue;
            }

            self.state = WatchState::Triggered;
            let plan = self.plan_for(&events);
            info!(
                events = events.len(),
                members = ?changed_members(&events),
                run = plan.member_count(),
                "change detected"
            );
            pass.announce(&events, &plan);

            self.state = WatchState::Executing;
            let summary = {
                let pass = Arc::clone(&pass);
                tokio::task::spawn_blocking(move || pass.run(&plan))
                    .await
                    .context("execution pass panicked")?
            };
            report.passes += 1;
            report.last_summary = Some(summary);
            baseline = settled;
        }

        info!(passes = report.passes, "watch stopped");
        Ok(report)
    }

    async fn scan(&self, previous: Option<&Snapshot>) -> Result<Snapshot> {
        let members = Arc::clone(&self.members);
        let options = Arc::clone(&self.scan_options);
        let previous = previous.cloned();
        tokio::task::spawn_blocking(move || scan(&members, &options, previous.as_ref()))
            .await
            .context("scan task failed")
    }
}
