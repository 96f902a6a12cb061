// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Component errors (`FilterError`, `OrderError`) are kept close to the code
//! that raises them and convert into [`WsrunError`] at the pipeline boundary.

use std::path::PathBuf;

use thiserror::Error;

use crate::dag::OrderError;
use crate::exec::PoolError;
use crate::filter::FilterError;

#[derive(Error, Debug)]
pub enum WsrunError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(
        "No workspace found at {0:?} (expected wsrun.toml or a package.json with \"workspaces\")"
    )]
    WorkspaceNotFound(PathBuf),

    #[error("Named filter not found: {0}")]
    FilterNotFound(String),

    #[error("Circular filter inheritance: {}", .0.join(" -> "))]
    CircularInheritance(Vec<String>),

    #[error("Dependency cycle between workspace members: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<FilterError> for WsrunError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::NotFound(name) => WsrunError::FilterNotFound(name),
            FilterError::CircularInheritance(chain) => WsrunError::CircularInheritance(chain),
        }
    }
}

impl From<OrderError> for WsrunError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Cycle(members) => WsrunError::DependencyCycle(members),
        }
    }
}

impl From<PoolError> for WsrunError {
    fn from(err: PoolError) -> Self {
        WsrunError::Other(anyhow::Error::new(err))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WsrunError>;
