// src/workspace/loader.rs

//! Workspace discovery from member globs and `package.json` manifests.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::{debug, info, warn};

use crate::errors::{Result, WsrunError};
use crate::workspace::manifest::{read_manifest, PackageManifest, LOCKFILES, MANIFEST_FILE};
use crate::workspace::member::{MemberDependencies, Workspace, WorkspaceMember};

/// Directories never descended into during discovery.
const SKIPPED_DIRS: &[&str] = &["node_modules"];

/// How deep below the root member directories are searched for.
const MAX_DISCOVERY_DEPTH: usize = 8;

/// Loads workspace members and the edges between them.
pub trait WorkspaceLoader {
    fn load(&self, root: &Path) -> Result<Workspace>;
}

/// Default loader: member globs from the project config, falling back to the
/// root `package.json` `"workspaces"` field.
#[derive(Debug, Clone, Default)]
pub struct ManifestWorkspaceLoader {
    member_globs: Option<Vec<String>>,
}

impl ManifestWorkspaceLoader {
    pub fn new(member_globs: Option<Vec<String>>) -> Self {
        Self { member_globs }
    }

    fn resolve_globs(&self, root: &Path) -> Result<Vec<String>> {
        if let Some(globs) = &self.member_globs {
            return Ok(globs.clone());
        }

        let root_manifest = read_manifest(root)?;
        match root_manifest.and_then(|m| m.workspaces) {
            Some(field) => Ok(field.patterns().to_vec()),
            None => Err(WsrunError::WorkspaceNotFound(root.to_path_buf())),
        }
    }
}

impl WorkspaceLoader for ManifestWorkspaceLoader {
    fn load(&self, root: &Path) -> Result<Workspace> {
        let root = root
            .canonicalize()
            .with_context(|| format!("resolving workspace root {:?}", root))?;
        let globs = self.resolve_globs(&root)?;
        let matcher = MemberGlobs::new(&globs)?;

        let mut candidates = Vec::new();
        collect_dirs(&root, &root, 0, &mut candidates)?;

        let mut members: Vec<WorkspaceMember> = Vec::new();
        let mut manifests: BTreeMap<String, PackageManifest> = BTreeMap::new();

        for rel in candidates {
            if !matcher.matches(&rel) {
                continue;
            }
            let abs = root.join(&rel);
            let Some(manifest) = read_manifest(&abs)? else {
                debug!(path = %rel, "matched directory has no {MANIFEST_FILE}; skipping");
                continue;
            };

            let name = manifest.name.clone().unwrap_or_else(|| dir_name(&abs));
            if manifests.contains_key(&name) {
                warn!(member = %name, path = %rel, "duplicate member name; keeping the first");
                continue;
            }

            let mut member = WorkspaceMember::new(name.clone(), rel, abs.clone());
            member.config_path = Some(abs.join(MANIFEST_FILE));
            member.deps_file_path = LOCKFILES
                .iter()
                .map(|f| abs.join(f))
                .find(|p| p.is_file());

            members.push(member);
            manifests.insert(name, manifest);
        }

        let dependencies = member_dependencies(&manifests);
        info!(
            root = ?root,
            members = members.len(),
            "loaded workspace"
        );

        Ok(Workspace {
            root,
            members,
            dependencies,
        })
    }
}

/// Include / exclude (`!`) member globs, matched against root-relative dirs.
struct MemberGlobs {
    include: GlobSet,
    exclude: GlobSet,
}

impl MemberGlobs {
    fn new(patterns: &[String]) -> Result<Self> {
        let mut include = GlobSetBuilder::new();
        let mut exclude = GlobSetBuilder::new();

        for raw in patterns {
            let (builder, pat) = match raw.strip_prefix('!') {
                Some(rest) => (&mut exclude, rest),
                None => (&mut include, raw.as_str()),
            };
            let pat = pat.trim_start_matches("./").trim_end_matches('/');
            // `*` stays within one path segment, as in npm/yarn workspaces.
            let glob = GlobBuilder::new(pat).literal_separator(true).build().map_err(|e| {
                WsrunError::Config(format!("invalid workspace member glob '{raw}': {e}"))
            })?;
            builder.add(glob);
        }

        let include = include.build().map_err(|e| WsrunError::Other(anyhow!(e)))?;
        let exclude = exclude.build().map_err(|e| WsrunError::Other(anyhow!(e)))?;
        Ok(Self { include, exclude })
    }

    fn matches(&self, rel: &str) -> bool {
        self.include.is_match(rel) && !self.exclude.is_match(rel)
    }
}

/// Collect root-relative directory paths (forward slashes), sorted.
fn collect_dirs(root: &Path, dir: &Path, depth: usize, out: &mut Vec<String>) -> Result<()> {
    if depth >= MAX_DISCOVERY_DEPTH {
        return Ok(());
    }

    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("reading directory {:?}", dir))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    entries.sort();

    for path in entries {
        let name = dir_name(&path);
        if name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_str()) {
            continue;
        }
        if let Ok(rel) = path.strip_prefix(root) {
            out.push(rel.to_string_lossy().replace('\\', "/"));
        }
        collect_dirs(root, &path, depth + 1, out)?;
    }
    Ok(())
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Keep only dependencies that name another workspace member.
fn member_dependencies(manifests: &BTreeMap<String, PackageManifest>) -> MemberDependencies {
    let names: BTreeSet<&str> = manifests.keys().map(|s| s.as_str()).collect();

    manifests
        .iter()
        .map(|(name, manifest)| {
            let deps = manifest
                .all_dependency_names()
                .into_iter()
                .filter(|dep| *dep != name.as_str() && names.contains(dep))
                .map(|dep| dep.to_string())
                .collect();
            (name.clone(), deps)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn discovers_members_from_root_manifest_workspaces() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join("package.json"), r#"{ "workspaces": ["packages/*"] }"#);
        write(
            &root.join("packages/core/package.json"),
            r#"{ "name": "core", "devDependencies": { "typescript": "5" } }"#,
        );
        write(
            &root.join("packages/web/package.json"),
            r#"{ "name": "web", "dependencies": { "core": "workspace:*", "react": "18" } }"#,
        );
        fs::create_dir_all(root.join("packages/empty")).unwrap();
        write(&root.join("packages/web/node_modules/core/package.json"), r#"{ "name": "core" }"#);

        let ws = ManifestWorkspaceLoader::default().load(root).unwrap();
        let names: Vec<_> = ws.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["core", "web"]);
        assert_eq!(ws.member("web").unwrap().path, "packages/web");
        assert_eq!(
            ws.dependencies["web"].iter().collect::<Vec<_>>(),
            vec!["core"]
        );
        assert!(ws.dependencies["core"].is_empty());
    }

    #[test]
    fn config_globs_support_exclusions() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join("packages/a/package.json"), r#"{ "name": "a" }"#);
        write(&root.join("packages/legacy/package.json"), r#"{ "name": "legacy" }"#);
        write(&root.join("apps/site/package.json"), r#"{}"#);

        let loader = ManifestWorkspaceLoader::new(Some(vec![
            "packages/*".into(),
            "apps/*".into(),
            "!packages/legacy".into(),
        ]));
        let ws = loader.load(root).unwrap();
        let mut names: Vec<_> = ws.members.iter().map(|m| m.name.clone()).collect();
        names.sort();
        // `site` has no name in its manifest; the directory name is used.
        assert_eq!(names, vec!["a".to_string(), "site".to_string()]);
    }

    #[test]
    fn no_workspace_definition_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("package.json"), r#"{ "name": "solo" }"#);

        let err = ManifestWorkspaceLoader::default().load(dir.path()).unwrap_err();
        assert!(matches!(err, WsrunError::WorkspaceNotFound(_)));
    }
}
