//! Repository manifest
//!
//! A manifest is a JSON array of repository descriptors. Each entry names a
//! source URL and optionally a local name, a subfolder to clone into, and a
//! set of tags used for filtering.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading a manifest. All of them are fatal for a run.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read manifest {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid manifest entry #{index}: {reason}")]
    InvalidEntry { index: usize, reason: String },
}

/// One repository descriptor.
///
/// All four keys must be present in the JSON; empty strings and empty lists
/// mean "unset".
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManifestEntry {
    /// Source repository URL
    pub url: String,

    /// Local name; derived from the URL when empty
    pub name: String,

    /// Folder to place the clone in; the working directory when empty
    pub subfolder: String,

    /// Tags used for scope filtering
    pub tags: BTreeSet<String>,
}

impl ManifestEntry {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: String::new(),
            subfolder: String::new(),
            tags: BTreeSet::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_subfolder(mut self, subfolder: impl Into<String>) -> Self {
        self.subfolder = subfolder.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Name used for filtering, logging and archive files.
    ///
    /// An explicit `name` is returned verbatim. Otherwise the last path
    /// segment of the URL is used, minus one trailing `.git`.
    pub fn resolve_name(&self) -> &str {
        if !self.name.is_empty() {
            return &self.name;
        }

        let segment = self
            .url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();

        segment.strip_suffix(".git").unwrap_or(segment)
    }

    /// Destination of the working copy, relative to the working directory.
    pub fn resolve_destination(&self) -> String {
        if self.subfolder.is_empty() {
            self.resolve_name().to_string()
        } else {
            format!("{}/{}", self.subfolder, self.resolve_name())
        }
    }

    /// Whether any of the entry's tags appear in `tags`
    pub fn has_any_tag(&self, tags: &BTreeSet<String>) -> bool {
        !self.tags.is_disjoint(tags)
    }
}

/// Names end up as directory and archive file names, so they may not walk
/// out of the folder they are placed in.
fn is_plain_name(name: &str) -> bool {
    name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// A loaded, validated manifest. Entries keep file order.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Load and validate a manifest file.
    ///
    /// The file's existence is checked before anything is read.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        if !path.exists() {
            return Err(ManifestError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let manifest = Self::parse(&content)?;
        debug!(
            "Loaded {} entries from {}",
            manifest.entries.len(),
            path.display()
        );

        Ok(manifest)
    }

    /// Parse and validate a manifest from JSON text
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let entries: Vec<ManifestEntry> = serde_json::from_str(content)?;
        Self::from_entries(entries)
    }

    pub fn from_entries(entries: Vec<ManifestEntry>) -> Result<Self, ManifestError> {
        for (index, entry) in entries.iter().enumerate() {
            if entry.url.is_empty() {
                return Err(ManifestError::InvalidEntry {
                    index,
                    reason: "url is empty".to_string(),
                });
            }
            let name = entry.resolve_name();
            if name.is_empty() {
                return Err(ManifestError::InvalidEntry {
                    index,
                    reason: format!("cannot derive a name from url '{}'", entry.url),
                });
            }
            if !is_plain_name(name) {
                return Err(ManifestError::InvalidEntry {
                    index,
                    reason: format!("name '{}' must be a single path component", name),
                });
            }
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
