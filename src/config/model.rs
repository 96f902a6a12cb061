// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::filter::NamedFilter;
use crate::types::RerunScope;

/// Top-level configuration as read from `wsrun.toml`.
///
/// ```toml
/// [workspace]
/// members = ["packages/*", "!packages/legacy"]
///
/// [filters.frontend]
/// patterns = ["app-*", "ui-*"]
/// extends = "base"
///
/// [run]
/// jobs = 8
/// timeout = "10m"
///
/// [watch]
/// poll_interval = "500ms"
/// debounce = "100ms"
/// rerun = "all"
/// ```
///
/// All sections are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProjectConfig {
    #[serde(default)]
    pub workspace: WorkspaceSection,

    /// Named filters from `[filters.<name>]`.
    #[serde(default)]
    pub filters: BTreeMap<String, NamedFilter>,

    #[serde(default)]
    pub run: RunSection,

    #[serde(default)]
    pub watch: WatchSection,
}

/// `[workspace]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkspaceSection {
    /// Member directory globs. If `None`, the root `package.json`
    /// `"workspaces"` field is used instead.
    #[serde(default)]
    pub members: Option<Vec<String>>,
}

/// `[run]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunSection {
    /// Upper bound on concurrently running scripts within a group.
    #[serde(default)]
    pub jobs: Option<usize>,

    /// Per-script timeout, e.g. `"10m"`.
    #[serde(default)]
    pub timeout: Option<String>,
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    #[serde(default = "default_debounce")]
    pub debounce: String,

    #[serde(default)]
    pub rerun: RerunScope,

    /// Globs (relative to each member directory) that never produce events.
    #[serde(default = "default_watch_exclude")]
    pub exclude: Vec<String>,

    /// Compare file contents (blake3) instead of trusting mtime alone.
    #[serde(default)]
    pub use_hash: bool,
}

fn default_poll_interval() -> String {
    "500ms".to_string()
}

fn default_debounce() -> String {
    "100ms".to_string()
}

pub fn default_watch_exclude() -> Vec<String> {
    [
        "**/node_modules/**",
        "**/.git/**",
        "**/dist/**",
        "**/build/**",
        "**/coverage/**",
        "**/.turbo/**",
        "**/.next/**",
        "**/*.tsbuildinfo",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            debounce: default_debounce(),
            rerun: RerunScope::default(),
            exclude: default_watch_exclude(),
            use_hash: false,
        }
    }
}

/// Validated configuration. Build it with `ProjectConfig::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub workspace_members: Option<Vec<String>>,
    pub filters: BTreeMap<String, NamedFilter>,
    pub run: RunSettings,
    pub watch: WatchSettings,
}

#[derive(Debug, Clone, Default)]
pub struct RunSettings {
    pub jobs: Option<usize>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub poll_interval: Duration,
    pub debounce: Duration,
    pub rerun: RerunScope,
    pub exclude: Vec<String>,
    pub use_hash: bool,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            debounce: Duration::from_millis(100),
            rerun: RerunScope::All,
            exclude: default_watch_exclude(),
            use_hash: false,
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            workspace_members: None,
            filters: BTreeMap::new(),
            run: RunSettings::default(),
            watch: WatchSettings::default(),
        }
    }
}
