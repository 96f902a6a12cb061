// src/config/mod.rs

//! Project configuration (`wsrun.toml`).
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate values and convert raw sections into typed settings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_named_filters, load_optional};
pub use model::{
    default_watch_exclude, ProjectConfig, RawProjectConfig, RunSection, RunSettings, WatchSection,
    WatchSettings, WorkspaceSection,
};
