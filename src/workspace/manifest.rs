// src/workspace/manifest.rs

//! The subset of `package.json` the orchestrator cares about.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const MANIFEST_FILE: &str = "package.json";

/// Lockfiles recognised as a member's dependency file, in priority order.
pub const LOCKFILES: &[&str] = &["package-lock.json", "pnpm-lock.yaml", "yarn.lock", "bun.lockb"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    #[serde(default)]
    pub name: Option<String>,

    /// Script name -> shell command. `None` when the field is absent, which
    /// the executor reports differently from an empty table.
    #[serde(default)]
    pub scripts: Option<BTreeMap<String, String>>,

    #[serde(default)]
    pub dependencies: BTreeMap<String, serde_json::Value>,

    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, serde_json::Value>,

    #[serde(default)]
    pub peer_dependencies: BTreeMap<String, serde_json::Value>,

    #[serde(default)]
    pub optional_dependencies: BTreeMap<String, serde_json::Value>,

    /// Root manifests only: member globs.
    #[serde(default)]
    pub workspaces: Option<WorkspacesField>,
}

/// `"workspaces"` is either a plain list or `{ "packages": [...] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WorkspacesField {
    List(Vec<String>),
    Object {
        #[serde(default)]
        packages: Vec<String>,
    },
}

impl WorkspacesField {
    pub fn patterns(&self) -> &[String] {
        match self {
            WorkspacesField::List(list) => list,
            WorkspacesField::Object { packages } => packages,
        }
    }
}

impl PackageManifest {
    /// Every package name this manifest depends on, across all dependency kinds.
    pub fn all_dependency_names(&self) -> BTreeSet<&str> {
        self.dependencies
            .keys()
            .chain(self.dev_dependencies.keys())
            .chain(self.peer_dependencies.keys())
            .chain(self.optional_dependencies.keys())
            .map(|s| s.as_str())
            .collect()
    }
}

/// Read `<dir>/package.json`. Returns `Ok(None)` when the file does not exist.
pub fn read_manifest(dir: &Path) -> Result<Option<PackageManifest>> {
    let path = dir.join(MANIFEST_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    let contents =
        fs::read_to_string(&path).with_context(|| format!("reading manifest at {:?}", path))?;
    let manifest: PackageManifest = serde_json::from_str(&contents)
        .with_context(|| format!("parsing JSON manifest from {:?}", path))?;
    Ok(Some(manifest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scripts_and_dependency_kinds() {
        let manifest: PackageManifest = serde_json::from_str(
            r#"{
                "name": "web",
                "scripts": { "build": "tsc -b" },
                "dependencies": { "core": "workspace:*" },
                "devDependencies": { "typescript": "^5.4.0" },
                "peerDependencies": { "react": ">=18" }
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.name.as_deref(), Some("web"));
        assert_eq!(
            manifest.scripts.as_ref().and_then(|s| s.get("build")).map(String::as_str),
            Some("tsc -b")
        );
        let deps = manifest.all_dependency_names();
        assert!(deps.contains("core"));
        assert!(deps.contains("typescript"));
        assert!(deps.contains("react"));
    }

    #[test]
    fn missing_scripts_is_none_not_empty() {
        let manifest: PackageManifest = serde_json::from_str(r#"{ "name": "x" }"#).unwrap();
        assert!(manifest.scripts.is_none());
    }

    #[test]
    fn workspaces_accepts_both_shapes() {
        let list: PackageManifest =
            serde_json::from_str(r#"{ "workspaces": ["packages/*"] }"#).unwrap();
        let object: PackageManifest =
            serde_json::from_str(r#"{ "workspaces": { "packages": ["apps/*"] } }"#).unwrap();

        assert_eq!(list.workspaces.unwrap().patterns(), ["packages/*".to_string()]);
        assert_eq!(object.workspaces.unwrap().patterns(), ["apps/*".to_string()]);
    }
}
