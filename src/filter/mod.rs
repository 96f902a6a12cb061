// src/filter/mod.rs

//! Member selection by filter expression.
//!
//! - [`pattern`] implements the single-wildcard glob and the
//!   negation-first matching rule.
//! - [`resolver`] expands named filters (with `extends` inheritance) and
//!   applies the resulting pattern list to the workspace members.

pub mod pattern;
pub mod resolver;

use serde::Deserialize;
use thiserror::Error;

pub use pattern::{glob_matches, matches_patterns, parse_pattern_list};
pub use resolver::{resolve, resolve_patterns, FilterSpec};

/// A named, reusable selection rule from `[filters.<name>]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NamedFilter {
    /// Ordered globs; `*` wildcard, leading `!` negates.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Parent filter whose patterns are evaluated before ours.
    #[serde(default)]
    pub extends: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

impl NamedFilter {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
            extends: None,
            description: None,
        }
    }

    pub fn extending(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// The filter chain references a name that is not defined.
    #[error("named filter not found: {0}")]
    NotFound(String),

    /// A name appeared twice in one `extends` chain. Holds the chain, ending
    /// with the repeated name.
    #[error("circular filter inheritance: {}", .0.join(" -> "))]
    CircularInheritance(Vec<String>),
}
