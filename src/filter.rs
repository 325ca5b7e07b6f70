//! Scope filtering for manifest entries
//!
//! Include filters (`--tag`, `--repo`) switch a run into allow-list mode:
//! anything they don't match is dropped and exclude filters are never
//! consulted. Exclude filters (`--not-tag`, `--not-repo`) only apply when no
//! include filter was given.

use crate::manifest::ManifestEntry;
use std::collections::BTreeSet;

/// Filters and flags built once per invocation from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub include_tags: BTreeSet<String>,
    pub exclude_tags: BTreeSet<String>,
    pub include_names: BTreeSet<String>,
    pub exclude_names: BTreeSet<String>,

    /// Enables fallback operations on failure; has no effect on scope
    pub force: bool,
}

fn to_set<I, S>(items: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_include_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_tags = to_set(tags);
        self
    }

    pub fn with_exclude_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_tags = to_set(tags);
        self
    }

    pub fn with_include_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_names = to_set(names);
        self
    }

    pub fn with_exclude_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_names = to_set(names);
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn has_include_filters(&self) -> bool {
        !self.include_tags.is_empty() || !self.include_names.is_empty()
    }

    /// Decide whether `entry` takes part in the current run.
    ///
    /// The checks run in a fixed order and the first one that applies wins:
    /// included name, included tag, any include filter present, excluded
    /// name, excluded tag, default include.
    pub fn is_in_scope(&self, entry: &ManifestEntry) -> bool {
        let name = entry.resolve_name();

        if !self.include_names.is_empty() && self.include_names.contains(name) {
            return true;
        }
        if !self.include_tags.is_empty() && entry.has_any_tag(&self.include_tags) {
            return true;
        }
        if self.has_include_filters() {
            return false;
        }
        if !self.exclude_names.is_empty() && self.exclude_names.contains(name) {
            return false;
        }
        if !self.exclude_tags.is_empty() && entry.has_any_tag(&self.exclude_tags) {
            return false;
        }

        true
    }
}
