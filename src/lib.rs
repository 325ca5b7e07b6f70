//! autorepo - batch git repository management from a JSON manifest
//!
//! Reads a manifest listing repositories and clones, pulls or archives
//! every entry selected by tag and name filters.
//!
//! ## Modules
//!
//! - [`manifest`]: Manifest entries, loading and destination resolution
//! - [`filter`]: Tag and name based scope filtering
//! - [`git`]: Version control backend driving the `git` executable
//! - [`runner`]: Per-entry clone, pull and backup with forced fallbacks
//! - [`config`]: Configuration management and parsing

pub mod cleanup;
pub mod config;
pub mod filter;
pub mod git;
pub mod manifest;
pub mod runner;

#[cfg(test)]
mod test_utils;

pub use config::Config;
pub use filter::FilterCriteria;
pub use git::{GitClient, Vcs, VcsError};
pub use manifest::{Manifest, ManifestEntry, ManifestError};
pub use runner::{Action, CommandRunner, EntryReport, Outcome, RunSummary};
