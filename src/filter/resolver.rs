// src/filter/resolver.rs

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};

use crate::filter::pattern::{matches_patterns, parse_pattern_list};
use crate::filter::{FilterError, NamedFilter};
use crate::workspace::WorkspaceMember;

/// A filter expression after named-filter expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSpec {
    /// No expression: every member matches.
    All,
    /// A named filter with its inherited patterns, ancestors first.
    Named { name: String, patterns: Vec<String> },
    /// A literal comma-separated glob list.
    Literal(Vec<String>),
}

impl FilterSpec {
    pub fn patterns(&self) -> &[String] {
        match self {
            FilterSpec::All => &[],
            FilterSpec::Named { patterns, .. } => patterns,
            FilterSpec::Literal(patterns) => patterns,
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        matches_patterns(self.patterns(), name)
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterSpec::All => f.write_str("all members"),
            FilterSpec::Named { name, patterns } => {
                write!(f, "filter '{}' [{}]", name, patterns.join(", "))
            }
            FilterSpec::Literal(patterns) => write!(f, "[{}]", patterns.join(", ")),
        }
    }
}

/// Interpret a filter expression.
///
/// - `None` / blank: [`FilterSpec::All`].
/// - `@name`: must be a named filter, otherwise [`FilterError::NotFound`].
/// - A name present in `named_filters`: that filter, inheritance expanded.
/// - Anything else: a literal comma-separated glob list.
pub fn resolve_patterns(
    filter_expr: Option<&str>,
    named_filters: &BTreeMap<String, NamedFilter>,
) -> Result<FilterSpec, FilterError> {
    let expr = match filter_expr.map(str::trim) {
        None | Some("") => return Ok(FilterSpec::All),
        Some(expr) => expr,
    };

    if let Some(name) = expr.strip_prefix('@') {
        if !named_filters.contains_key(name) {
            return Err(FilterError::NotFound(name.to_string()));
        }
        return named_spec(name, named_filters);
    }

    if named_filters.contains_key(expr) {
        return named_spec(expr, named_filters);
    }

    Ok(FilterSpec::Literal(parse_pattern_list(expr)))
}

/// Select the members matching `filter_expr`, preserving workspace order.
pub fn resolve(
    filter_expr: Option<&str>,
    named_filters: &BTreeMap<String, NamedFilter>,
    all_members: &[WorkspaceMember],
) -> Result<Vec<WorkspaceMember>, FilterError> {
    let spec = resolve_patterns(filter_expr, named_filters)?;
    let selected: Vec<WorkspaceMember> = all_members
        .iter()
        .filter(|m| spec.matches(&m.name))
        .cloned()
        .collect();

    debug!(
        filter = %spec,
        matched = selected.len(),
        total = all_members.len(),
        "resolved filter"
    );
    Ok(selected)
}

fn named_spec(
    name: &str,
    named_filters: &BTreeMap<String, NamedFilter>,
) -> Result<FilterSpec, FilterError> {
    let patterns = match inherited_patterns(name, named_filters) {
        Ok(patterns) => patterns,
        Err(FilterError::NotFound(missing)) => {
            // A broken parent link degrades to the filter's own patterns.
            warn!(
                filter = %name,
                missing = %missing,
                "filter inherits from an unknown filter; ignoring inheritance"
            );
            named_filters
                .get(name)
                .map(|f| f.patterns.clone())
                .unwrap_or_default()
        }
        Err(err) => return Err(err),
    };

    Ok(FilterSpec::Named {
        name: name.to_string(),
        patterns,
    })
}

/// Walk the `extends` chain from `name` to its root ancestor and concatenate
/// patterns root-first.
fn inherited_patterns(
    name: &str,
    named_filters: &BTreeMap<String, NamedFilter>,
) -> Result<Vec<String>, FilterError> {
    let mut chain: Vec<&str> = Vec::new();
    let mut layers: Vec<&NamedFilter> = Vec::new();
    let mut current = Some(name);

    while let Some(cur) = current {
        if chain.contains(&cur) {
            let mut cycle: Vec<String> = chain.iter().map(|s| s.to_string()).collect();
            cycle.push(cur.to_string());
            return Err(FilterError::CircularInheritance(cycle));
        }
        let filter = named_filters
            .get(cur)
            .ok_or_else(|| FilterError::NotFound(cur.to_string()))?;
        chain.push(cur);
        layers.push(filter);
        current = filter.extends.as_deref();
    }

    Ok(layers
        .into_iter()
        .rev()
        .flat_map(|f| f.patterns.iter().cloned())
        .collect())
}
