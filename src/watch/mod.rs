// src/watch/mod.rs

//! Watch mode: poll member directories and re-run on change.
//!
//! - [`snapshot`] scans member trees and turns snapshot differences into
//!   [`ChangeEvent`]s.
//! - [`hash`] provides optional content hashing so touch-only changes are
//!   ignored.
//! - [`watcher`] drives the poll / debounce / execute loop.
//!
//! It knows nothing about how scripts run; a pass is an [`ExecutionPass`].

pub mod hash;
pub mod snapshot;
pub mod watcher;

pub use hash::compute_file_hash;
pub use snapshot::{changed_members, diff, scan, ChangeEvent, ScanOptions, Snapshot};
pub use watcher::{ExecutionPass, WatchOptions, WatchReport, WatchState, Watcher};
