// src/filter/pattern.rs

/// Match a member name against one glob.
///
/// A pattern with a `*` is split at the first `*`; the name must start with
/// the prefix and end with the suffix. The two checks are independent, so
/// `a*a` matches `"a"`. Any later `*` is literal. A pattern without `*` must
/// equal the name.
pub fn glob_matches(pattern: &str, name: &str) -> bool {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => name.starts_with(prefix) && name.ends_with(suffix),
        None => pattern == name,
    }
}

/// Apply an ordered pattern list to a member name.
///
/// - Any matching `!pattern` excludes the member, whatever else matches.
/// - Otherwise the member matches if some positive pattern matches it.
/// - An empty list matches everything.
pub fn matches_patterns<S: AsRef<str>>(patterns: &[S], name: &str) -> bool {
    if patterns.is_empty() {
        return true;
    }

    let excluded = patterns
        .iter()
        .filter_map(|p| p.as_ref().strip_prefix('!'))
        .any(|neg| glob_matches(neg, name));
    if excluded {
        return false;
    }

    patterns
        .iter()
        .map(AsRef::as_ref)
        .filter(|p| !p.starts_with('!'))
        .any(|pos| glob_matches(pos, name))
}

/// Split a literal filter expression (`"pkg-*, !pkg-internal"`) into patterns.
/// Blank entries are dropped.
pub fn parse_pattern_list(expr: &str) -> Vec<String> {
    expr.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
