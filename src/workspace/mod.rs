// src/workspace/mod.rs

//! Workspace model and discovery.
//!
//! - [`member`] holds the immutable member type and dependency edge map.
//! - [`manifest`] reads the parts of `package.json` we need.
//! - [`loader`] turns a root directory into a [`Workspace`].

pub mod loader;
pub mod manifest;
pub mod member;

pub use loader::{ManifestWorkspaceLoader, WorkspaceLoader};
pub use manifest::{read_manifest, PackageManifest};
pub use member::{owner_of, MemberDependencies, MemberName, Workspace, WorkspaceMember};
