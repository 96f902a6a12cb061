// src/workspace/member.rs

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Canonical member name type used throughout the crate.
pub type MemberName = String;

/// Workspace-internal dependency edges: member name -> names it depends on.
///
/// Only names of other workspace members are meaningful here; anything else
/// is ignored by the orderer.
pub type MemberDependencies = BTreeMap<MemberName, BTreeSet<MemberName>>;

/// One package in the monorepo.
///
/// Built once per invocation by a [`crate::workspace::WorkspaceLoader`] and
/// never mutated afterwards; workers share it read-only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkspaceMember {
    /// Unique name within the workspace (the manifest `"name"`).
    pub name: MemberName,
    /// Path relative to the workspace root, forward slashes.
    pub path: String,
    /// Absolute path; scripts run with this as their working directory.
    pub abs_path: PathBuf,
    /// Member manifest, opaque to the orchestrator.
    pub config_path: Option<PathBuf>,
    /// Member lockfile / dependency file, opaque to the orchestrator.
    pub deps_file_path: Option<PathBuf>,
}

impl WorkspaceMember {
    pub fn new(
        name: impl Into<MemberName>,
        path: impl Into<String>,
        abs_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            abs_path: abs_path.into(),
            config_path: None,
            deps_file_path: None,
        }
    }
}

/// Result of loading a workspace: its members plus the edges between them.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    pub root: PathBuf,
    pub members: Vec<WorkspaceMember>,
    pub dependencies: MemberDependencies,
}

impl Workspace {
    pub fn member(&self, name: &str) -> Option<&WorkspaceMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// The deepest member whose directory contains `path`.
///
/// Nested members own their own files: a file under `packages/a/sub` where
/// `sub` is itself a member belongs to `sub`, not `a`.
pub fn owner_of<'a>(path: &Path, members: &'a [WorkspaceMember]) -> Option<&'a WorkspaceMember> {
    members
        .iter()
        .filter(|m| path.starts_with(&m.abs_path))
        .max_by_key(|m| m.abs_path.components().count())
}
