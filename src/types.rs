use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Which members a watch-triggered pass re-executes.
///
/// - `All`: re-run the whole originally selected member set on every change
///   (default).
/// - `Affected`: re-run only members whose files changed, plus every selected
///   member that transitively depends on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RerunScope {
    #[default]
    All,
    Affected,
}

impl FromStr for RerunScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(RerunScope::All),
            "affected" => Ok(RerunScope::Affected),
            other => Err(format!(
                "invalid rerun scope: {other} (expected \"all\" or \"affected\")"
            )),
        }
    }
}

impl fmt::Display for RerunScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RerunScope::All => f.write_str("all"),
            RerunScope::Affected => f.write_str("affected"),
        }
    }
}

/// Kind of filesystem change observed by the watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChangeType {
    Created,
    Modified,
    Deleted,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeType::Created => f.write_str("created"),
            ChangeType::Modified => f.write_str("modified"),
            ChangeType::Deleted => f.write_str("deleted"),
        }
    }
}

/// Parse a duration string like `"500ms"`, `"3s"`, `"10m"` or `"1h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit suffix (ms, s, m, h)"))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;

    let secs_per_unit = match unit_part.trim().to_lowercase().as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        unit => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };
    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
