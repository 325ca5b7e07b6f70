//! Command runner - applies clone, pull or backup to manifest entries
//!
//! Every entry is handled on its own: a failure is logged with the
//! operation and repository name, recorded as [`Outcome::Failed`], and the
//! batch moves on. When `force` is set a failed primary operation gets one
//! fallback attempt (pull after a failed clone, clone after pulling a
//! missing checkout, fresh clone for backups).

use crate::cleanup::remove_dir_best_effort;
use crate::config::{BackupConfig, Config};
use crate::filter::FilterCriteria;
use crate::git::{GitClient, Vcs, VcsError};
use crate::manifest::ManifestEntry;
use futures::stream::{self, StreamExt};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Operation applied to each in-scope entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Clone,
    Pull,
    Backup,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Clone => "clone",
            Action::Pull => "pull",
            Action::Backup => "backup",
        };
        f.write_str(name)
    }
}

/// Result of processing one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Entry was outside the filter scope
    Skipped,
    /// Primary operation succeeded
    Succeeded,
    /// Primary operation failed and the forced fallback succeeded
    FallbackSucceeded,
    /// Operation (and fallback, if any) failed
    Failed { error: String },
}

impl Outcome {
    fn failed(error: &VcsError) -> Self {
        Outcome::Failed {
            error: error.to_string(),
        }
    }
}

/// Per-entry line of a run report
#[derive(Debug, Clone)]
pub struct EntryReport {
    pub name: String,
    pub destination: String,
    pub outcome: Outcome,
}

/// Results from a complete batch run, in manifest order
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub action: Action,
    pub reports: Vec<EntryReport>,
    pub duration: Duration,
}

impl RunSummary {
    fn count(&self, predicate: impl Fn(&Outcome) -> bool) -> usize {
        self.reports.iter().filter(|r| predicate(&r.outcome)).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|o| *o == Outcome::Succeeded)
    }

    pub fn fallback_succeeded(&self) -> usize {
        self.count(|o| *o == Outcome::FallbackSucceeded)
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| *o == Outcome::Skipped)
    }
}

/// Applies an [`Action`] to manifest entries through a [`Vcs`] backend
pub struct CommandRunner<V: Vcs = GitClient> {
    vcs: V,
    backup: BackupConfig,
}

impl CommandRunner<GitClient> {
    /// Build a runner backed by the git executable described in `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(GitClient::new(config.git.clone()), config.backup.clone())
    }
}

impl<V: Vcs> CommandRunner<V> {
    pub fn new(vcs: V, backup: BackupConfig) -> Self {
        Self { vcs, backup }
    }

    fn archive_path(&self, name: &str) -> PathBuf {
        PathBuf::from(&self.backup.archive_directory).join(format!("{}.tar", name))
    }

    /// Process a single entry
    pub async fn run(
        &self,
        action: Action,
        entry: &ManifestEntry,
        criteria: &FilterCriteria,
    ) -> Outcome {
        let name = entry.resolve_name();

        if !criteria.is_in_scope(entry) {
            debug!("Skipped {}", name);
            return Outcome::Skipped;
        }

        let destination = PathBuf::from(entry.resolve_destination());

        match action {
            Action::Clone => self.clone_entry(entry, name, &destination, criteria.force).await,
            Action::Pull => self.pull_entry(entry, name, &destination, criteria.force).await,
            Action::Backup => {
                if criteria.force {
                    self.backup_fresh(entry, name).await
                } else {
                    self.backup_existing(name, &destination).await
                }
            }
        }
    }

    async fn clone_entry(
        &self,
        entry: &ManifestEntry,
        name: &str,
        destination: &Path,
        force: bool,
    ) -> Outcome {
        match self.vcs.clone_repo(&entry.url, destination).await {
            Ok(()) => {
                debug!("Cloned {}", name);
                Outcome::Succeeded
            }
            Err(e) if force => {
                error!("Couldn't clone {}, trying to pull: {}", name, e);
                match self.vcs.pull(destination).await {
                    Ok(()) => {
                        debug!("Pulled {}", name);
                        Outcome::FallbackSucceeded
                    }
                    Err(e) => {
                        error!("Failed to pull {}: {}", name, e);
                        Outcome::failed(&e)
                    }
                }
            }
            Err(e) => {
                error!("Failed to clone {}: {}", name, e);
                Outcome::failed(&e)
            }
        }
    }

    async fn pull_entry(
        &self,
        entry: &ManifestEntry,
        name: &str,
        destination: &Path,
        force: bool,
    ) -> Outcome {
        match self.vcs.pull(destination).await {
            Ok(()) => {
                debug!("Pulled {}", name);
                Outcome::Succeeded
            }
            Err(e) if force && e.is_missing_repository() => {
                error!("Couldn't pull {}, trying to clone", name);
                match self.vcs.clone_repo(&entry.url, destination).await {
                    Ok(()) => {
                        debug!("Cloned {}", name);
                        Outcome::FallbackSucceeded
                    }
                    Err(e) => {
                        error!("Failed to clone {}: {}", name, e);
                        Outcome::failed(&e)
                    }
                }
            }
            Err(e) => {
                error!("Failed to pull {}: {}", name, e);
                Outcome::failed(&e)
            }
        }
    }

    /// Archive the working copy already present at the destination
    async fn backup_existing(&self, name: &str, destination: &Path) -> Outcome {
        match self.vcs.archive(destination, &self.archive_path(name)).await {
            Ok(()) => {
                debug!("Backed up {}", name);
                Outcome::Succeeded
            }
            Err(e) => {
                error!("Failed to back up {}: {}", name, e);
                Outcome::failed(&e)
            }
        }
    }

    /// Clone into a private scratch directory, archive it, then remove the scratch copy
    async fn backup_fresh(&self, entry: &ManifestEntry, name: &str) -> Outcome {
        let scratch = match tempfile::Builder::new()
            .prefix(&self.backup.temp_prefix)
            .tempdir()
        {
            Ok(dir) => dir,
            Err(e) => {
                error!("Failed to create scratch directory for {}: {}", name, e);
                return Outcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        let checkout = scratch.path().join("checkout");
        let result = match self.vcs.clone_repo(&entry.url, &checkout).await {
            Ok(()) => self.vcs.archive(&checkout, &self.archive_path(name)).await,
            Err(e) => Err(e),
        };

        let removal = tokio::task::spawn_blocking(move || {
            remove_dir_best_effort(scratch.path());
            drop(scratch);
        });
        if let Err(e) = removal.await {
            error!("Scratch cleanup for {} did not finish: {}", name, e);
        }

        match result {
            Ok(()) => {
                debug!("Backed up {}", name);
                Outcome::Succeeded
            }
            Err(e) => {
                error!("Failed to back up {}: {}", name, e);
                Outcome::failed(&e)
            }
        }
    }

    /// Process every entry and collect the outcomes in manifest order.
    ///
    /// `max_parallel` of 1 handles entries strictly one after another.
    pub async fn run_all(
        &self,
        action: Action,
        entries: &[ManifestEntry],
        criteria: &FilterCriteria,
        max_parallel: usize,
    ) -> RunSummary {
        let start_time = Instant::now();
        info!("Action: {}", action);

        let reports = stream::iter(entries)
            .map(|entry| async move {
                EntryReport {
                    name: entry.resolve_name().to_string(),
                    destination: entry.resolve_destination(),
                    outcome: self.run(action, entry, criteria).await,
                }
            })
            .buffered(max_parallel.max(1))
            .collect::<Vec<_>>()
            .await;

        let summary = RunSummary {
            action,
            reports,
            duration: start_time.elapsed(),
        };

        info!(
            "{} completed in {:.2}s: {} succeeded, {} via fallback, {} failed, {} skipped",
            action,
            summary.duration.as_secs_f64(),
            summary.succeeded(),
            summary.fallback_succeeded(),
            summary.failed(),
            summary.skipped()
        );

        summary
    }
}
