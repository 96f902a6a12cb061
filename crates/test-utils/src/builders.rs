#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use tempfile::TempDir;
use wsrun::workspace::{ManifestWorkspaceLoader, Workspace, WorkspaceLoader};

/// Builder for an on-disk npm-style workspace in a temp directory.
///
/// Members land in `packages/<name>` and the root `package.json` declares
/// `"workspaces": ["packages/*"]`.
pub struct WorkspaceBuilder {
    members: Vec<MemberSpec>,
    config: Option<String>,
}

struct MemberSpec {
    name: String,
    scripts: Option<Vec<(String, String)>>,
    deps: Vec<String>,
}

impl WorkspaceBuilder {
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
            config: None,
        }
    }

    /// A member with the given scripts and workspace dependencies.
    pub fn member(mut self, name: &str, scripts: &[(&str, &str)], deps: &[&str]) -> Self {
        self.members.push(MemberSpec {
            name: name.to_string(),
            scripts: Some(
                scripts
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            deps: deps.iter().map(|d| d.to_string()).collect(),
        });
        self
    }

    /// A member whose manifest has no `"scripts"` object at all.
    pub fn member_without_scripts(mut self, name: &str, deps: &[&str]) -> Self {
        self.members.push(MemberSpec {
            name: name.to_string(),
            scripts: None,
            deps: deps.iter().map(|d| d.to_string()).collect(),
        });
        self
    }

    /// Contents for `wsrun.toml` at the root.
    pub fn config(mut self, toml: &str) -> Self {
        self.config = Some(toml.to_string());
        self
    }

    pub fn build(self) -> TestWorkspace {
        let dir = tempfile::tempdir().expect("creating temp workspace");
        let root = dir.path();

        write_json(
            &root.join("package.json"),
            &json!({ "name": "root", "private": true, "workspaces": ["packages/*"] }),
        );
        if let Some(config) = &self.config {
            fs::write(root.join("wsrun.toml"), config).expect("writing wsrun.toml");
        }

        for spec in &self.members {
            let member_dir = root.join("packages").join(&spec.name);
            fs::create_dir_all(&member_dir).expect("creating member dir");

            let mut manifest = Map::new();
            manifest.insert("name".into(), json!(spec.name));
            manifest.insert("version".into(), json!("1.0.0"));
            if let Some(scripts) = &spec.scripts {
                let table: Map<String, Value> = scripts
                    .iter()
                    .map(|(k, v)| (k.clone(), json!(v)))
                    .collect();
                manifest.insert("scripts".into(), Value::Object(table));
            }
            if !spec.deps.is_empty() {
                let deps: Map<String, Value> = spec
                    .deps
                    .iter()
                    .map(|d| (d.clone(), json!("workspace:*")))
                    .collect();
                manifest.insert("dependencies".into(), Value::Object(deps));
            }
            write_json(&member_dir.join("package.json"), &Value::Object(manifest));
        }

        TestWorkspace { dir }
    }
}

impl Default for WorkspaceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn write_json(path: &Path, value: &Value) {
    let text = serde_json::to_string_pretty(value).expect("serialising manifest");
    fs::write(path, text).expect("writing manifest");
}

/// A workspace on disk; deleted when dropped.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn member_dir(&self, name: &str) -> PathBuf {
        self.dir.path().join("packages").join(name)
    }

    /// Load through the production loader.
    pub fn load(&self) -> Workspace {
        ManifestWorkspaceLoader::default()
            .load(self.root())
            .expect("loading test workspace")
    }
}
