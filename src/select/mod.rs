// src/select/mod.rs

//! Change-aware narrowing of the filtered member set.
//!
//! The change detector itself is a collaborator behind [`ChangeDetector`];
//! [`git::GitChangeDetector`] is the default implementation.

pub mod git;

use std::path::Path;

use tracing::info;

use crate::errors::Result;
use crate::workspace::WorkspaceMember;

pub use git::GitChangeDetector;

/// Options forwarded to the change detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeOptions {
    /// Compare against the merge base with this ref.
    pub base_ref: String,
    /// Count staged and unstaged modifications.
    pub include_uncommitted: bool,
    /// Count files git does not track yet.
    pub include_untracked: bool,
}

impl Default for ChangeOptions {
    fn default() -> Self {
        Self {
            base_ref: "main".to_string(),
            include_uncommitted: true,
            include_untracked: true,
        }
    }
}

/// Reports which of the candidate members have changed.
pub trait ChangeDetector: Send + Sync {
    fn detect(
        &self,
        root: &Path,
        candidates: &[WorkspaceMember],
        options: &ChangeOptions,
    ) -> Result<Vec<WorkspaceMember>>;
}

/// Outcome of member selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Members to run, in workspace order.
    Members(Vec<WorkspaceMember>),
    /// Nothing to do. Not an error; carries the message for the user.
    Empty(String),
}

/// Replace the candidate set with the members the detector reports changed.
///
/// Candidate order is preserved and members the detector invents (not in the
/// candidate set) are dropped.
pub fn narrow_to_changed(
    root: &Path,
    candidates: Vec<WorkspaceMember>,
    detector: &dyn ChangeDetector,
    options: &ChangeOptions,
) -> Result<Selection> {
    if candidates.is_empty() {
        return Ok(Selection::Empty("No workspace members match the filter.".to_string()));
    }

    let changed = detector.detect(root, &candidates, options)?;
    let narrowed: Vec<WorkspaceMember> = candidates
        .into_iter()
        .filter(|c| changed.iter().any(|m| m.name == c.name))
        .collect();

    info!(
        base_ref = %options.base_ref,
        changed = narrowed.len(),
        "narrowed selection to changed members"
    );

    if narrowed.is_empty() {
        return Ok(Selection::Empty(format!(
            "No matching workspace members changed since '{}'.",
            options.base_ref
        )));
    }
    Ok(Selection::Members(narrowed))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<&'static str>);

    impl ChangeDetector for Fixed {
        fn detect(
            &self,
            _root: &Path,
            candidates: &[WorkspaceMember],
            _options: &ChangeOptions,
        ) -> Result<Vec<WorkspaceMember>> {
            Ok(candidates
                .iter()
                .filter(|m| self.0.contains(&m.name.as_str()))
                .cloned()
                .collect())
        }
    }

    fn member(name: &str) -> WorkspaceMember {
        WorkspaceMember::new(name, name, format!("/ws/{name}"))
    }

    #[test]
    fn keeps_only_changed_members_in_candidate_order() {
        let candidates = vec![member("a"), member("b"), member("c")];
        let selection = narrow_to_changed(
            Path::new("/ws"),
            candidates,
            &Fixed(vec!["c", "a"]),
            &ChangeOptions::default(),
        )
        .unwrap();

        assert_eq!(selection, Selection::Members(vec![member("a"), member("c")]));
    }

    #[test]
    fn nothing_changed_is_an_empty_selection() {
        let selection = narrow_to_changed(
            Path::new("/ws"),
            vec![member("a")],
            &Fixed(vec![]),
            &ChangeOptions::default(),
        )
        .unwrap();

        match selection {
            Selection::Empty(msg) => assert!(msg.contains("main")),
            other => panic!("expected empty selection, got {other:?}"),
        }
    }
}
