// src/dag/order.rs

use tracing::{debug, warn};

use crate::dag::graph::MemberGraph;
use crate::dag::OrderError;
use crate::workspace::{MemberDependencies, WorkspaceMember};

/// Execution plan for a member set.
///
/// `parallel_groups` flattened in order equals `order`; members inside one
/// group have no dependency relationship with each other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderResult {
    pub order: Vec<WorkspaceMember>,
    pub parallel_groups: Vec<Vec<WorkspaceMember>>,
}

impl OrderResult {
    pub fn member_count(&self) -> usize {
        self.order.len()
    }

    /// Keep only the named members, preserving group structure and dropping
    /// groups that become empty.
    ///
    /// Used by watch mode to re-run an affected subset: removing members from
    /// a valid layering keeps it valid.
    pub fn retain<F>(&self, mut keep: F) -> OrderResult
    where
        F: FnMut(&WorkspaceMember) -> bool,
    {
        let parallel_groups: Vec<Vec<WorkspaceMember>> = self
            .parallel_groups
            .iter()
            .map(|g| g.iter().filter(|m| keep(m)).cloned().collect::<Vec<_>>())
            .filter(|g| !g.is_empty())
            .collect();
        let order = parallel_groups.iter().flatten().cloned().collect();
        OrderResult {
            order,
            parallel_groups,
        }
    }
}

/// Layer `members` into dependency-respecting groups.
///
/// With `ordered = false` every member lands in one group in input order and
/// no graph is built.
pub fn order(
    members: &[WorkspaceMember],
    deps: &MemberDependencies,
    ordered: bool,
) -> Result<OrderResult, OrderError> {
    if !ordered {
        let parallel_groups = if members.is_empty() {
            Vec::new()
        } else {
            vec![members.to_vec()]
        };
        return Ok(OrderResult {
            order: members.to_vec(),
            parallel_groups,
        });
    }

    let graph = MemberGraph::build(members, deps);
    let layers = kahn_layers(&graph)?;

    let parallel_groups: Vec<Vec<WorkspaceMember>> = layers
        .into_iter()
        .map(|layer| layer.into_iter().map(|i| members[i].clone()).collect())
        .collect();
    let order: Vec<WorkspaceMember> = parallel_groups.iter().flatten().cloned().collect();

    debug!(
        members = order.len(),
        groups = parallel_groups.len(),
        "computed dependency order"
    );

    Ok(OrderResult {
        order,
        parallel_groups,
    })
}

/// Kahn's algorithm, one layer per round. Layers hold member indices in
/// ascending (input) order.
fn kahn_layers(graph: &MemberGraph) -> Result<Vec<Vec<usize>>, OrderError> {
    let mut in_degree = graph.in_degrees();
    let mut layers: Vec<Vec<usize>> = Vec::new();
    let mut consumed = 0usize;

    let mut current: Vec<usize> = (0..graph.len()).filter(|&i| in_degree[i] == 0).collect();

    while !current.is_empty() {
        let mut next = Vec::new();
        for &idx in &current {
            for dependent in graph.dependents(idx) {
                if dependent == idx {
                    continue;
                }
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    next.push(dependent);
                }
            }
        }
        next.sort_unstable();
        consumed += current.len();
        layers.push(std::mem::replace(&mut current, next));
    }

    if consumed < graph.len() {
        let mut cycle = graph.cycle_members();
        if cycle.is_empty() {
            cycle = (0..graph.len())
                .filter(|&i| in_degree[i] > 0)
                .map(|i| graph.name(i).to_string())
                .collect();
        }
        warn!(members = ?cycle, "dependency cycle between workspace members");
        return Err(OrderError::Cycle(cycle));
    }

    Ok(layers)
}
