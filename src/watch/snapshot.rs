// src/watch/snapshot.rs

//! Polling change detection: snapshot member trees and diff snapshots.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, trace};

use crate::types::ChangeType;
use crate::watch::hash::compute_file_hash;
use crate::workspace::{owner_of, WorkspaceMember};

/// Probe child used to ask whether an exclude covers a whole directory.
const DIR_PROBE: &str = ".wsrun-probe";

/// One file change, attributed to the deepest member containing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub file_path: PathBuf,
    pub change_type: ChangeType,
    pub member: WorkspaceMember,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
    hash: Option<String>,
}

impl FileStamp {
    fn same_metadata(&self, other: &FileStamp) -> bool {
        self.modified == other.modified && self.len == other.len
    }

    fn same_content(&self, other: &FileStamp) -> bool {
        match (&self.hash, &other.hash) {
            (Some(a), Some(b)) => a == b,
            _ => self.same_metadata(other),
        }
    }
}

/// State of every watched file at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    files: BTreeMap<PathBuf, FileStamp>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }
}

/// What to scan and how to compare.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    exclude: GlobSet,
    use_hash: bool,
}

impl ScanOptions {
    /// `exclude` globs are matched against paths relative to each member.
    pub fn new(exclude: &[String], use_hash: bool) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in exclude {
            let glob = Glob::new(pattern)
                .with_context(|| format!("invalid watch exclude glob '{pattern}'"))?;
            builder.add(glob);
        }
        Ok(Self {
            exclude: builder.build().context("building watch exclude set")?,
            use_hash,
        })
    }

    fn excludes_file(&self, rel: &Path) -> bool {
        self.exclude.is_match(rel)
    }

    fn excludes_dir(&self, rel: &Path) -> bool {
        self.exclude.is_match(rel) || self.exclude.is_match(rel.join(DIR_PROBE))
    }
}

/// Scan every file under the member directories.
///
/// Directories that are themselves one of `members` are left to that
/// member's own walk. With hashing enabled, a file whose metadata is
/// unchanged since `previous` keeps its previous hash instead of being read.
pub fn scan(
    members: &[WorkspaceMember],
    options: &ScanOptions,
    previous: Option<&Snapshot>,
) -> Snapshot {
    let roots: BTreeSet<&Path> = members.iter().map(|m| m.abs_path.as_path()).collect();
    let mut snapshot = Snapshot::default();

    for member in members {
        walk(&member.abs_path, &member.abs_path, &roots, options, previous, &mut snapshot);
    }

    trace!(files = snapshot.len(), "scan complete");
    snapshot
}

fn walk(
    member_root: &Path,
    dir: &Path,
    roots: &BTreeSet<&Path>,
    options: &ScanOptions,
    previous: Option<&Snapshot>,
    out: &mut Snapshot,
) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(?dir, error = %err, "skipping unreadable directory");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(meta) = fs::symlink_metadata(&path) else {
            continue;
        };
        let rel = path.strip_prefix(member_root).unwrap_or(&path);

        if meta.is_dir() {
            if roots.contains(path.as_path()) || options.excludes_dir(rel) {
                continue;
            }
            walk(member_root, &path, roots, options, previous, out);
            continue;
        }

        if options.excludes_file(rel) {
            continue;
        }

        let mut stamp = FileStamp {
            modified: meta.modified().ok(),
            len: meta.len(),
            hash: None,
        };
        if options.use_hash && meta.is_file() {
            stamp.hash = reuse_hash(previous, &path, &stamp)
                .or_else(|| compute_file_hash(&path).ok());
        }
        out.files.insert(path, stamp);
    }
}

fn reuse_hash(previous: Option<&Snapshot>, path: &Path, stamp: &FileStamp) -> Option<String> {
    let old = previous?.files.get(path)?;
    if old.same_metadata(stamp) {
        old.hash.clone()
    } else {
        None
    }
}

/// Changes from `old` to `new`, sorted by path.
///
/// Files owned by none of `members` are dropped.
pub fn diff(old: &Snapshot, new: &Snapshot, members: &[WorkspaceMember]) -> Vec<ChangeEvent> {
    let mut events = Vec::new();
    let mut push = |path: &Path, change_type: ChangeType| {
        if let Some(owner) = owner_of(path, members) {
            events.push(ChangeEvent {
                file_path: path.to_path_buf(),
                change_type,
                member: owner.clone(),
            });
        }
    };

    for (path, stamp) in &new.files {
        match old.files.get(path) {
            None => push(path, ChangeType::Created),
            Some(prev) if !prev.same_content(stamp) => push(path, ChangeType::Modified),
            Some(_) => {}
        }
    }
    for path in old.files.keys() {
        if !new.files.contains_key(path) {
            push(path, ChangeType::Deleted);
        }
    }

    events.sort_by(|a, b| a.file_path.cmp(&b.file_path));
    events
}

/// Names of the members touched by `events`, deduplicated, in event order.
pub fn changed_members(events: &[ChangeEvent]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    events
        .iter()
        .filter(|e| seen.insert(e.member.name.clone()))
        .map(|e| e.member.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, Vec<WorkspaceMember>) {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("packages/a");
        let inner = a.join("inner");
        fs::create_dir_all(inner.join("src")).unwrap();
        fs::create_dir_all(a.join("node_modules/dep")).unwrap();
        fs::write(a.join("index.js"), "a").unwrap();
        fs::write(a.join("node_modules/dep/index.js"), "dep").unwrap();
        fs::write(inner.join("src/lib.js"), "inner").unwrap();
        let members = vec![
            WorkspaceMember::new("a", "packages/a", a),
            WorkspaceMember::new("inner", "packages/a/inner", inner),
        ];
        (dir, members)
    }

    fn opts(use_hash: bool) -> ScanOptions {
        ScanOptions::new(&crate::config::default_watch_exclude(), use_hash).unwrap()
    }

    #[test]
    fn scan_skips_excluded_directories() {
        let (_dir, members) = setup();
        let snap = scan(&members, &opts(false), None);
        assert_eq!(snap.len(), 2);
        assert!(snap.contains(&members[0].abs_path.join("index.js")));
        assert!(!snap.contains(&members[0].abs_path.join("node_modules/dep/index.js")));
    }

    #[test]
    fn diff_reports_created_modified_deleted_with_owner() {
        let (_dir, members) = setup();
        let before = scan(&members, &opts(false), None);

        fs::write(members[0].abs_path.join("new.js"), "x").unwrap();
        fs::remove_file(members[0].abs_path.join("index.js")).unwrap();
        fs::write(members[1].abs_path.join("src/lib.js"), "changed length").unwrap();

        let after = scan(&members, &opts(false), Some(&before));
        let events = diff(&before, &after, &members);
        let summary: Vec<(String, ChangeType, String)> = events
            .iter()
            .map(|e| {
                (
                    e.file_path.file_name().unwrap().to_string_lossy().into_owned(),
                    e.change_type,
                    e.member.name.clone(),
                )
            })
            .collect();

        assert!(summary.contains(&("new.js".into(), ChangeType::Created, "a".into())));
        assert!(summary.contains(&("index.js".into(), ChangeType::Deleted, "a".into())));
        assert!(summary.contains(&("lib.js".into(), ChangeType::Modified, "inner".into())));
        assert_eq!(changed_members(&events).len(), 2);
    }

    #[test]
    fn identical_snapshots_produce_no_events() {
        let (_dir, members) = setup();
        let a = scan(&members, &opts(true), None);
        let b = scan(&members, &opts(true), Some(&a));
        assert!(diff(&a, &b, &members).is_empty());
    }

    #[test]
    fn hashing_ignores_metadata_only_changes() {
        let old = Snapshot {
            files: BTreeMap::from([(
                PathBuf::from("/ws/a/x.js"),
                FileStamp { modified: None, len: 1, hash: Some("h".into()) },
            )]),
        };
        let mut new = old.clone();
        if let Some(stamp) = new.files.get_mut(Path::new("/ws/a/x.js")) {
            stamp.modified = Some(SystemTime::now());
        }
        let members = vec![WorkspaceMember::new("a", "a", "/ws/a")];
        assert!(diff(&old, &new, &members).is_empty());
    }

    #[test]
    fn bad_exclude_glob_is_rejected() {
        assert!(ScanOptions::new(&["a[".to_string()], false).is_err());
    }
}
