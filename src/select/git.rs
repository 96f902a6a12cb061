// src/select/git.rs

//! Change detection through the `git` CLI.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, Context};
use tracing::debug;

use crate::errors::Result;
use crate::select::{ChangeDetector, ChangeOptions};
use crate::workspace::{owner_of, WorkspaceMember};

/// Detects changed members from `git diff` / `git ls-files` output.
///
/// A member has changed when at least one changed file lies inside its
/// directory (nested members own their own files).
#[derive(Debug, Clone, Default)]
pub struct GitChangeDetector;

impl GitChangeDetector {
    /// Absolute paths of every file changed according to `options`.
    ///
    /// Listings are NUL-separated (`-z`) so paths git would C-quote come
    /// through verbatim.
    pub fn changed_files(
        &self,
        root: &Path,
        options: &ChangeOptions,
    ) -> Result<BTreeSet<PathBuf>> {
        let toplevel = PathBuf::from(git(root, &["rev-parse", "--show-toplevel"])?.trim());
        let toplevel = toplevel.canonicalize().unwrap_or(toplevel);

        let range = format!("{}...HEAD", options.base_ref);
        let mut listings = vec![git(&toplevel, &["diff", "--name-only", "-z", &range])?];
        if options.include_uncommitted {
            listings.push(git(&toplevel, &["diff", "--name-only", "-z", "HEAD"])?);
        }
        if options.include_untracked {
            listings.push(git(
                &toplevel,
                &["ls-files", "-z", "--others", "--exclude-standard", "--full-name"],
            )?);
        }

        let files: BTreeSet<PathBuf> = listings
            .iter()
            .flat_map(|out| split_nul(out))
            .map(|name| toplevel.join(name))
            .collect();

        debug!(count = files.len(), base_ref = %options.base_ref, "git reported changed files");
        Ok(files)
    }
}

impl ChangeDetector for GitChangeDetector {
    fn detect(
        &self,
        root: &Path,
        candidates: &[WorkspaceMember],
        options: &ChangeOptions,
    ) -> Result<Vec<WorkspaceMember>> {
        let files = self.changed_files(root, options)?;
        let changed: BTreeSet<&str> = files
            .iter()
            .filter_map(|f| owner_of(f, candidates))
            .map(|m| m.name.as_str())
            .collect();

        Ok(candidates
            .iter()
            .filter(|m| changed.contains(m.name.as_str()))
            .cloned()
            .collect())
    }
}

fn split_nul(listing: &str) -> impl Iterator<Item = &str> {
    listing.split('\0').filter(|name| !name.is_empty())
}

/// Run a git subcommand in `dir` and return its stdout.
fn git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .with_context(|| format!("running git {}", args.join(" ")))?;

    if !output.status.success() {
        return Err(anyhow!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        )
        .into());
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
