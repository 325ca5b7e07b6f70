use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for autorepo
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    /// Manifest location defaults
    #[serde(default)]
    pub manifest: ManifestConfig,

    /// Git executable settings
    #[serde(default)]
    pub git: GitConfig,

    /// Batch processing behavior
    #[serde(default)]
    pub sync: SyncConfig,

    /// Archive output settings for the backup command
    #[serde(default)]
    pub backup: BackupConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Manifest configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ManifestConfig {
    /// Manifest used when `--file` is not given
    #[serde(default = "default_manifest_file")]
    pub default_file: String,
}

/// Git configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GitConfig {
    /// Git executable to invoke
    #[serde(default = "default_git_binary")]
    pub binary: String,

    /// Fast-forward only pulls
    #[serde(default)]
    pub fast_forward_only: bool,

    /// Timeout for a single git command in seconds, unlimited when unset
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// Synchronization configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SyncConfig {
    /// Maximum repositories processed at once; 1 keeps the run sequential
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
}

/// Backup configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BackupConfig {
    /// Directory receiving `<name>.tar` archives
    #[serde(default = "default_archive_directory")]
    pub archive_directory: String,

    /// Prefix for the scratch directories used by forced backups
    #[serde(default = "default_temp_prefix")]
    pub temp_prefix: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String, // "debug"

    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,
}

// Default value functions
fn default_manifest_file() -> String {
    "repos.json".to_string()
}
fn default_git_binary() -> String {
    "git".to_string()
}
fn default_max_parallel() -> usize {
    1
}
fn default_archive_directory() -> String {
    ".".to_string()
}
fn default_temp_prefix() -> String {
    "automated_repo".to_string()
}
fn default_log_level() -> String {
    "debug".to_string()
}
fn default_true() -> bool {
    true
}

// Default implementations
impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            default_file: default_manifest_file(),
        }
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            binary: default_git_binary(),
            fast_forward_only: false,
            timeout: None,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            archive_directory: default_archive_directory(),
            temp_prefix: default_temp_prefix(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            color: default_true(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to defaults
    ///
    /// A missing file is not an error and nothing is written to disk.
    pub fn load_or_default() -> Result<Self> {
        match Self::default_config_path() {
            Ok(config_path) if config_path.exists() => Self::load(&config_path),
            _ => {
                let mut config = Self::default();
                config.expand_paths()?;
                Ok(config)
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        // Expand environment variables in paths
        config.expand_paths()?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("autorepo").join("config.yml"))
    }

    /// Expand environment variables in configuration paths
    pub fn expand_paths(&mut self) -> Result<()> {
        self.manifest.default_file = shellexpand::full(&self.manifest.default_file)
            .context("Failed to expand manifest.default_file path")?
            .into_owned();

        self.backup.archive_directory = shellexpand::full(&self.backup.archive_directory)
            .context("Failed to expand backup.archive_directory path")?
            .into_owned();

        Ok(())
    }

    /// Parallelism actually used for a run; never below one
    pub fn effective_parallelism(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.sync.max_parallel).max(1)
    }
}
