use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use autorepo::config::LoggingConfig;
use autorepo::{Action, CommandRunner, Config, FilterCriteria, Manifest};

#[derive(Parser, Debug)]
#[command(name = "autorepo")]
#[command(about = "Automate multiple repos management in a folder")]
#[command(version)]
struct Cli {
    /// The command to execute
    #[arg(value_enum)]
    command: CliCommand,

    /// The manifest file to parse (defaults to repos.json)
    #[arg(long)]
    file: Option<PathBuf>,

    /// Only process repositories carrying this tag
    #[arg(short = 't', long = "tag", value_name = "TAG")]
    tags: Vec<String>,

    /// Ignore repositories carrying this tag (short form: -nt)
    #[arg(long = "not-tag", value_name = "TAG")]
    not_tags: Vec<String>,

    /// Only process this repository
    #[arg(short = 'r', long = "repo", value_name = "NAME")]
    repos: Vec<String>,

    /// Ignore this repository (short form: -nr)
    #[arg(long = "not-repo", value_name = "NAME")]
    not_repos: Vec<String>,

    /// Fall back to the alternate operation when the primary one fails
    #[arg(short, long)]
    force: bool,

    /// Repositories processed at once (defaults to 1, sequential)
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Configuration file path (defaults to XDG config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging, including every git invocation
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum CliCommand {
    /// Clone every selected repository
    Clone,
    /// Pull every selected repository
    Pull,
    /// Archive every selected repository to <name>.tar
    Backup,
    /// Show the selected repositories without touching them
    List,
}

impl Cli {
    fn filter_criteria(&self) -> FilterCriteria {
        FilterCriteria::new()
            .with_include_tags(self.tags.iter().cloned())
            .with_exclude_tags(self.not_tags.iter().cloned())
            .with_include_names(self.repos.iter().cloned())
            .with_exclude_names(self.not_repos.iter().cloned())
            .with_force(self.force)
    }
}

/// Rewrite the two-letter short flags clap cannot express into long flags
fn expand_short_aliases<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut positional_only = false;

    args.into_iter()
        .map(|arg| {
            if positional_only {
                return arg;
            }
            match arg.to_str() {
                Some("--") => {
                    positional_only = true;
                    arg
                }
                Some("-nt") => OsString::from("--not-tag"),
                Some("-nr") => OsString::from("--not-repo"),
                Some(s) if s.starts_with("-nt=") => OsString::from(format!("--not-tag={}", &s[4..])),
                Some(s) if s.starts_with("-nr=") => {
                    OsString::from(format!("--not-repo={}", &s[4..]))
                }
                Some(s) if s.starts_with("-nt") => OsString::from(format!("--not-tag={}", &s[3..])),
                Some(s) if s.starts_with("-nr") => {
                    OsString::from(format!("--not-repo={}", &s[3..]))
                }
                _ => arg,
            }
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_from(expand_short_aliases(std::env::args_os()));

    // Load configuration
    let config = load_config(cli.config.as_deref())?;

    init_logging(cli.verbose, cli.quiet, &config.logging)?;

    let manifest_path = cli
        .file
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.manifest.default_file));
    let manifest = Manifest::load(&manifest_path)
        .with_context(|| format!("Failed to load manifest {}", manifest_path.display()))?;

    let criteria = cli.filter_criteria();

    match cli.command {
        CliCommand::Clone => cmd_run(Action::Clone, &manifest, &criteria, cli.jobs, &config).await,
        CliCommand::Pull => cmd_run(Action::Pull, &manifest, &criteria, cli.jobs, &config).await,
        CliCommand::Backup => cmd_run(Action::Backup, &manifest, &criteria, cli.jobs, &config).await,
        CliCommand::List => cmd_list(&manifest, &criteria),
    }
}

/// Initialize logging based on verbosity flags and configuration
fn init_logging(verbose: bool, quiet: bool, logging: &LoggingConfig) -> Result<()> {
    let fallback = if verbose {
        "trace"
    } else if quiet {
        "error"
    } else {
        logging.level.as_str()
    };

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(fallback)
            .with_context(|| format!("Invalid log level: {}", fallback))?,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(logging.color && std::env::var_os("NO_COLOR").is_none()))
        .with(filter)
        .init();

    Ok(())
}

/// Load configuration from specified path or default location
fn load_config(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load(path),
        None => Config::load_or_default(),
    }
}

/// Apply a git action to every selected repository
async fn cmd_run(
    action: Action,
    manifest: &Manifest,
    criteria: &FilterCriteria,
    jobs: Option<usize>,
    config: &Config,
) -> Result<()> {
    let parallelism = config.effective_parallelism(jobs);
    if parallelism > 1 {
        info!("Processing up to {} repositories at once", parallelism);
    }

    let runner = CommandRunner::from_config(config);
    runner
        .run_all(action, manifest.entries(), criteria, parallelism)
        .await;

    Ok(())
}

/// List repositories selected by the filters
fn cmd_list(manifest: &Manifest, criteria: &FilterCriteria) -> Result<()> {
    let selected: Vec<_> = manifest
        .entries()
        .iter()
        .filter(|entry| criteria.is_in_scope(entry))
        .collect();

    println!("Repositories ({}):", selected.len());

    for entry in selected {
        if entry.tags.is_empty() {
            println!("  📁 {} -> {}", entry.resolve_name(), entry.resolve_destination());
        } else {
            let tags: Vec<&str> = entry.tags.iter().map(String::as_str).collect();
            println!(
                "  📁 {} -> {} [{}]",
                entry.resolve_name(),
                entry.resolve_destination(),
                tags.join(", ")
            );
        }
    }

    Ok(())
}
