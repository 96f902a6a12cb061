// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod filter;
pub mod logging;
pub mod report;
pub mod select;
pub mod types;
pub mod watch;
pub mod workspace;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::ProjectConfig;
use crate::dag::OrderResult;
use crate::engine::{ConsolePass, Pipeline, Prepared, RunRequest};
use crate::exec::{
    default_executor, ProcessRunner, ScriptInvocation, ShellRunner, StopSignal, WorkerPool,
};
use crate::filter::{resolve_patterns, NamedFilter};
use crate::select::{ChangeOptions, GitChangeDetector};
use crate::watch::{ExecutionPass, WatchOptions, Watcher};
use crate::workspace::ManifestWorkspaceLoader;

/// High-level entry point used by `main.rs`. Returns the process exit code.
///
/// This wires together:
/// - config loading
/// - workspace discovery, filtering, change narrowing and ordering
/// - the executor and console reporter
/// - Ctrl-C forwarding to running scripts
/// - (optional) the watch loop
pub async fn run(args: CliArgs) -> Result<i32> {
    let config_path = config_path(&args);
    let cfg = config::load_optional(&config_path)
        .with_context(|| format!("loading {:?}", config_path))?
        .unwrap_or_default();

    if args.list_filters {
        print_filters(&cfg.filters);
        return Ok(0);
    }

    let Some(script) = args.script.clone() else {
        anyhow::bail!("no script given");
    };
    let invocation = ScriptInvocation::new(script, args.args.clone());

    let pipeline = Pipeline::new(
        Box::new(ManifestWorkspaceLoader::new(cfg.workspace_members.clone())),
        Arc::new(GitChangeDetector),
        cfg.filters.clone(),
    );
    let request = RunRequest {
        root: args.root.clone(),
        filter: args.filter.clone(),
        ordered: !args.no_order,
        changed: args.changed.then(|| ChangeOptions {
            base_ref: args.base_ref.clone(),
            include_uncommitted: !args.no_uncommitted,
            include_untracked: !args.no_untracked,
        }),
        invocation: invocation.clone(),
    };

    let prepared = match pipeline.prepare(&request)? {
        Prepared::Ready(prepared) => prepared,
        Prepared::NothingToDo(message) => {
            println!("{message}");
            return Ok(0);
        }
    };

    if args.dry_run {
        print_plan(&invocation, &prepared.plan);
        return Ok(0);
    }

    let pool = worker_pool(&args, &cfg);
    let timeout = args.timeout.or(cfg.run.timeout);
    debug!(workers = pool.size(), ?timeout, "executor configured");

    let runner = ShellRunner::new();
    let interrupted = listen_for_interrupt(runner.clone());
    let executor = Arc::new(default_executor(pool, timeout, runner.clone()));
    let pass: Arc<dyn ExecutionPass> =
        Arc::new(ConsolePass::new(executor, invocation, args.verbose));

    if !args.watch {
        let summary = {
            let pass = Arc::clone(&pass);
            let plan = prepared.plan.clone();
            tokio::task::spawn_blocking(move || pass.run(&plan))
                .await
                .context("execution pass panicked")?
        };
        if runner.is_stopping() {
            return Ok(INTERRUPTED_EXIT_CODE);
        }
        return Ok(summary.exit_code());
    }

    let mut options = WatchOptions::from(&cfg.watch);
    if let Some(scope) = args.rerun_scope {
        options.rerun = scope;
    }
    let watched = prepared.selected.len();
    let mut watcher = Watcher::new(
        prepared.selected,
        &prepared.workspace.dependencies,
        prepared.plan,
        &options,
    )?;

    let initial = watcher.run_initial(&pass).await?;
    if runner.is_stopping() {
        return Ok(INTERRUPTED_EXIT_CODE);
    }

    println!("Watching {watched} member(s) for changes (Ctrl-C to stop)");
    let report = watcher.run(pass, stopped(interrupted)).await?;
    info!(passes = report.passes, "watch finished");

    Ok(report.last_summary.unwrap_or(initial).exit_code())
}

/// Exit code of a run cut short by Ctrl-C.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Forward Ctrl-C to the running scripts.
///
/// The first Ctrl-C interrupts them and flips the returned flag; any later
/// one kills them.
fn listen_for_interrupt(runner: ShellRunner) -> tokio::sync::watch::Receiver<bool> {
    let (tx, rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        let mut signal = StopSignal::Interrupt;
        loop {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "failed to listen for Ctrl-C; run will not stop on signal");
                // Holding `tx` keeps the flag from ever reading as stopped.
                std::future::pending::<()>().await;
            }
            let signalled = runner.interrupt_all(signal);
            info!(signalled, ?signal, "interrupt received");
            tx.send_replace(true);
            signal = StopSignal::Kill;
        }
    });
    rx
}

/// Resolves once the interrupt flag is set.
async fn stopped(mut interrupted: tokio::sync::watch::Receiver<bool>) {
    let _ = interrupted.wait_for(|stopped| *stopped).await;
}

fn config_path(args: &CliArgs) -> PathBuf {
    if args.config.is_absolute() {
        args.config.clone()
    } else {
        args.root.join(&args.config)
    }
}

/// `--sequential` wins over `--jobs`, which wins over `[run].jobs`.
fn worker_pool(args: &CliArgs, cfg: &ProjectConfig) -> WorkerPool {
    if args.sequential {
        WorkerPool::sequential()
    } else if let Some(jobs) = args.jobs.or(cfg.run.jobs) {
        WorkerPool::new(jobs)
    } else {
        WorkerPool::with_default_size()
    }
}

fn print_filters(filters: &BTreeMap<String, NamedFilter>) {
    if filters.is_empty() {
        println!("No named filters defined.");
        return;
    }
    for (name, filter) in filters {
        let patterns = match resolve_patterns(Some(&format!("@{name}")), filters) {
            Ok(spec) => spec.patterns().join(", "),
            Err(err) => format!("<{err}>"),
        };
        match &filter.description {
            Some(description) => println!("{name}: {patterns}  # {description}"),
            None => println!("{name}: {patterns}"),
        }
    }
}

fn print_plan(invocation: &ScriptInvocation, plan: &OrderResult) {
    println!(
        "wsrun dry-run: '{}' in {} member(s), {} group(s)",
        invocation.script,
        plan.member_count(),
        plan.parallel_groups.len()
    );
    for (idx, group) in plan.parallel_groups.iter().enumerate() {
        println!("  group {}:", idx + 1);
        for member in group {
            println!("    - {} ({})", member.name, member.path);
        }
    }
}
