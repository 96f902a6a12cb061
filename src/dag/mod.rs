// src/dag/mod.rs

//! Dependency ordering of workspace members.
//!
//! - [`graph`] holds the member -> member dependency graph restricted to the
//!   selected members.
//! - [`order`] layers that graph into parallel-safe groups.

pub mod graph;
pub mod order;

use thiserror::Error;

pub use graph::MemberGraph;
pub use order::{order, OrderResult};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// Members that sit on a dependency cycle, sorted by name.
    #[error("dependency cycle detected between: {}", .0.join(", "))]
    Cycle(Vec<String>),
}
