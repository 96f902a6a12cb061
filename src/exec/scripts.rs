// src/exec/scripts.rs

//! Script-table lookup for a member.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;

use crate::workspace::read_manifest;

/// Script name -> shell command.
pub type ScriptTable = BTreeMap<String, String>;

/// Loads a member's script table, keyed by its absolute directory.
///
/// `Ok(None)` means the member defines no scripts at all, which the executor
/// reports differently from a table that lacks one script.
pub trait ScriptSource: Send + Sync {
    fn load(&self, member_dir: &Path) -> Result<Option<ScriptTable>>;
}

/// Reads the `"scripts"` object of the member's `package.json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageJsonScripts;

impl ScriptSource for PackageJsonScripts {
    fn load(&self, member_dir: &Path) -> Result<Option<ScriptTable>> {
        Ok(read_manifest(member_dir)?.and_then(|m| m.scripts))
    }
}

/// Join a script command with extra arguments.
pub fn build_command(command: &str, args: &[String]) -> String {
    if args.is_empty() {
        command.to_string()
    } else {
        format!("{} {}", command, args.join(" "))
    }
}
