// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::types::{parse_duration, RerunScope};

/// Command-line arguments for `wsrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "wsrun",
    version,
    about = "Run a package script across workspace members in dependency order.",
    long_about = None
)]
pub struct CliArgs {
    /// Script to run in every selected member (e.g. `build`, `test`).
    #[arg(value_name = "SCRIPT", required_unless_present = "list_filters")]
    pub script: Option<String>,

    /// Extra arguments appended to the script command.
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Workspace root directory.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Path to the project config (TOML), relative to the workspace root.
    #[arg(long, value_name = "PATH", default_value = "wsrun.toml")]
    pub config: PathBuf,

    /// Filter expression: comma-separated globs (`pkg-*,!pkg-internal`),
    /// a named filter, or `@name` to require a named filter.
    #[arg(long, short = 'F', value_name = "EXPR")]
    pub filter: Option<String>,

    /// Ignore inter-member dependencies and run everything as one group.
    ///
    /// Maximises parallelism but gives up ordering guarantees: a member may
    /// start before a sibling whose output it depends on has been built.
    #[arg(long)]
    pub no_order: bool,

    /// Run members of a group one at a time instead of in parallel.
    #[arg(long)]
    pub sequential: bool,

    /// Echo stdout of successful members too.
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Only run members changed since `--base-ref`.
    #[arg(long)]
    pub changed: bool,

    /// Git ref used by `--changed`.
    #[arg(long, value_name = "REF", default_value = "main")]
    pub base_ref: String,

    /// With `--changed`, ignore uncommitted modifications.
    #[arg(long)]
    pub no_uncommitted: bool,

    /// With `--changed`, ignore untracked files.
    #[arg(long)]
    pub no_untracked: bool,

    /// Keep running and re-execute when member files change.
    #[arg(long, short = 'w')]
    pub watch: bool,

    /// Which members a watch-triggered pass re-runs (overrides config).
    #[arg(long, value_name = "SCOPE")]
    pub rerun_scope: Option<RerunScope>,

    /// Maximum number of concurrent scripts per group (overrides config).
    #[arg(long, short = 'j', value_name = "N")]
    pub jobs: Option<usize>,

    /// Kill a script that runs longer than this (e.g. `90s`, `10m`).
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WSRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the selected members and execution groups without running anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the named filters from the project config and exit.
    #[arg(long)]
    pub list_filters: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
