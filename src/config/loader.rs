// src/config/loader.rs

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{ProjectConfig, RawProjectConfig};
use crate::errors::Result;
use crate::filter::NamedFilter;

/// Load a configuration file from a given path and return the raw
/// `RawProjectConfig`.
///
/// This only performs TOML deserialization; it does **not** validate values.
/// Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawProjectConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let config: RawProjectConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ProjectConfig> {
    let raw_config = load_from_path(&path)?;
    ProjectConfig::try_from(raw_config)
}

/// Like [`load_and_validate`], but a missing file is `Ok(None)`.
///
/// The project config is optional: a plain `package.json` workspace runs
/// without one.
pub fn load_optional(path: impl AsRef<Path>) -> Result<Option<ProjectConfig>> {
    let path = path.as_ref();
    if !path.is_file() {
        debug!(?path, "no project config file; using defaults");
        return Ok(None);
    }
    load_and_validate(path).map(Some)
}

/// Named-filter loader: the `[filters.<name>]` tables of a config file.
///
/// A missing file yields an empty map.
pub fn load_named_filters(path: impl AsRef<Path>) -> Result<BTreeMap<String, NamedFilter>> {
    Ok(load_optional(path)?
        .map(|cfg| cfg.filters)
        .unwrap_or_default())
}
