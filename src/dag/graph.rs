// src/dag/graph.rs

use std::collections::{BTreeSet, HashMap, VecDeque};

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;

use crate::workspace::{MemberDependencies, WorkspaceMember};

/// Dependency graph over a set of members, keyed by position in that set.
///
/// Edge direction: dependency -> dependent. For `web` depending on `core`
/// there is an edge `core -> web`. Dependencies on names outside the member
/// set are dropped, so external packages never affect ordering.
#[derive(Debug, Clone)]
pub struct MemberGraph {
    names: Vec<String>,
    index: HashMap<String, usize>,
    graph: DiGraphMap<usize, ()>,
}

impl MemberGraph {
    pub fn build(members: &[WorkspaceMember], deps: &MemberDependencies) -> Self {
        let names: Vec<String> = members.iter().map(|m| m.name.clone()).collect();
        let index: HashMap<String, usize> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();

        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
        for i in 0..names.len() {
            graph.add_node(i);
        }

        for (dependent, dependencies) in deps.iter() {
            let Some(&to) = index.get(dependent) else {
                continue;
            };
            for dep in dependencies {
                if let Some(&from) = index.get(dep) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        Self { names, index, graph }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, idx: usize) -> &str {
        &self.names[idx]
    }

    /// Number of in-set dependencies of each member, by index.
    pub fn in_degrees(&self) -> Vec<usize> {
        (0..self.len())
            .map(|i| self.graph.neighbors_directed(i, Direction::Incoming).count())
            .collect()
    }

    /// Indices of members that depend directly on `idx`.
    pub fn dependents(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.graph.neighbors_directed(idx, Direction::Outgoing)
    }

    /// Names of the direct in-set dependencies of `name`.
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        match self.index.get(name) {
            Some(&idx) => self
                .graph
                .neighbors_directed(idx, Direction::Incoming)
                .map(|i| self.name(i))
                .collect(),
            None => Vec::new(),
        }
    }

    /// `roots` plus every member that transitively depends on one of them.
    pub fn with_dependents<'a, I>(&self, roots: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = vec![false; self.len()];
        let mut queue: VecDeque<usize> = roots
            .into_iter()
            .filter_map(|n| self.index.get(n).copied())
            .collect();

        while let Some(idx) = queue.pop_front() {
            if std::mem::replace(&mut seen[idx], true) {
                continue;
            }
            queue.extend(self.dependents(idx).filter(|d| !seen[*d]));
        }

        seen.iter()
            .enumerate()
            .filter(|(_, s)| **s)
            .map(|(i, _)| self.names[i].clone())
            .collect()
    }

    /// Members on a dependency cycle: strongly connected components with
    /// more than one member, or a member depending on itself.
    pub fn cycle_members(&self) -> Vec<String> {
        let mut members: Vec<String> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .flatten()
            .map(|i| self.names[i].clone())
            .collect();
        members.sort();
        members
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(names: &[&str]) -> Vec<WorkspaceMember> {
        names
            .iter()
            .map(|n| WorkspaceMember::new(*n, *n, format!("/ws/{n}")))
            .collect()
    }

    fn deps(edges: &[(&str, &[&str])]) -> MemberDependencies {
        edges
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    #[test]
    fn ignores_dependencies_outside_the_member_set() {
        let graph = MemberGraph::build(
            &members(&["web", "core"]),
            &deps(&[("web", &["core", "react"]), ("cli", &["core"])]),
        );
        assert_eq!(graph.dependencies_of("web"), vec!["core"]);
        assert_eq!(graph.in_degrees(), vec![1, 0]);
    }

    #[test]
    fn with_dependents_is_transitive() {
        let graph = MemberGraph::build(
            &members(&["a", "b", "c", "d"]),
            &deps(&[("b", &["a"]), ("c", &["b"])]),
        );
        let affected = graph.with_dependents(["a"]);
        assert_eq!(affected.into_iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);

        let affected = graph.with_dependents(["d"]);
        assert_eq!(affected.into_iter().collect::<Vec<_>>(), vec!["d"]);
    }

    #[test]
    fn cycle_members_excludes_bystanders() {
        let graph = MemberGraph::build(
            &members(&["x", "y", "z"]),
            &deps(&[("x", &["y"]), ("y", &["x"]), ("z", &["x"])]),
        );
        assert_eq!(graph.cycle_members(), vec!["x".to_string(), "y".to_string()]);
    }
}
