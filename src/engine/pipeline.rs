// src/engine/pipeline.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::dag;
use crate::engine::{Prepared, PreparedRun, RunRequest};
use crate::errors::Result;
use crate::filter::{self, NamedFilter};
use crate::select::{narrow_to_changed, ChangeDetector, Selection};
use crate::workspace::WorkspaceLoader;

/// Filter -> select -> order, with the collaborators injected.
pub struct Pipeline {
    loader: Box<dyn WorkspaceLoader>,
    detector: Arc<dyn ChangeDetector>,
    named_filters: BTreeMap<String, NamedFilter>,
}

impl Pipeline {
    pub fn new(
        loader: Box<dyn WorkspaceLoader>,
        detector: Arc<dyn ChangeDetector>,
        named_filters: BTreeMap<String, NamedFilter>,
    ) -> Self {
        Self {
            loader,
            detector,
            named_filters,
        }
    }

    /// Build the execution plan for `request`.
    ///
    /// Configuration problems (no workspace, unknown `@filter`, circular
    /// filter inheritance) and dependency cycles are errors. An empty
    /// selection is not.
    pub fn prepare(&self, request: &RunRequest) -> Result<Prepared> {
        let workspace = self.loader.load(&request.root)?;

        let matched = filter::resolve(
            request.filter.as_deref(),
            &self.named_filters,
            &workspace.members,
        )?;
        debug!(
            filter = ?request.filter,
            matched = matched.len(),
            total = workspace.members.len(),
            "filter resolved"
        );

        let selected = match &request.changed {
            None if matched.is_empty() => {
                return Ok(Prepared::NothingToDo(
                    "No workspace members match the filter.".to_string(),
                ));
            }
            None => matched,
            Some(options) => {
                let detector = self.detector.as_ref();
                match narrow_to_changed(&workspace.root, matched, detector, options)? {
                    Selection::Members(members) => members,
                    Selection::Empty(message) => return Ok(Prepared::NothingToDo(message)),
                }
            }
        };

        let plan = dag::order(&selected, &workspace.dependencies, request.ordered)?;
        info!(
            members = plan.member_count(),
            groups = plan.parallel_groups.len(),
            ordered = request.ordered,
            "execution plan ready"
        );

        Ok(Prepared::Ready(PreparedRun {
            workspace,
            selected,
            plan,
        }))
    }
}
