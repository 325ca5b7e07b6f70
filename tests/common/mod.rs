//! Common test utilities and helpers for autorepo tests

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Whether a usable `git` executable is on the PATH
pub fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Scratch area holding origin repositories, a working directory and config
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub origins_dir: PathBuf,
    pub work_dir: PathBuf,
    pub config_home: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let origins_dir = temp_dir.path().join("origins");
        let work_dir = temp_dir.path().join("work");
        let config_home = temp_dir.path().join("config");
        for dir in [&origins_dir, &work_dir, &config_home] {
            std::fs::create_dir_all(dir).expect("Failed to create test dir");
        }

        Self {
            temp_dir,
            origins_dir,
            work_dir,
            config_home,
        }
    }

    fn git(&self, cwd: &Path, args: &[&str]) {
        let output = std::process::Command::new("git")
            .args(["-c", "user.name=autorepo", "-c", "user.email=autorepo@example.com"])
            .args(args)
            .current_dir(cwd)
            .output()
            .expect("Failed to run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    /// Create an origin repository with a single commit; returns its URL
    pub fn create_origin(&self, name: &str) -> String {
        let path = self.origins_dir.join(format!("{}.git", name));
        std::fs::create_dir_all(&path).expect("Failed to create origin");
        self.git(&path, &["init", "--quiet"]);
        self.commit(name, "README.md", name);
        path.to_string_lossy().into_owned()
    }

    /// Add a commit to an existing origin repository
    pub fn commit(&self, name: &str, file: &str, contents: &str) {
        let path = self.origins_dir.join(format!("{}.git", name));
        std::fs::write(path.join(file), contents).expect("Failed to write file");
        self.git(&path, &["add", file]);
        self.git(&path, &["commit", "--quiet", "-m", contents]);
    }

    /// Write `repos.json` into the working directory
    pub fn write_manifest(&self, content: &str) -> PathBuf {
        let path = self.work_dir.join("repos.json");
        std::fs::write(&path, content).expect("Failed to write manifest");
        path
    }

    /// The binary, isolated from the user's configuration, running in `work_dir`
    pub fn command(&self) -> Command {
        let config_path = self.config_home.join("autorepo.yml");
        if !config_path.exists() {
            self.write_config("logging:\n  level: debug\n  color: false\n");
        }

        let mut cmd = Command::cargo_bin("autorepo").expect("binary should be built");
        cmd.arg("--config")
            .arg(&config_path)
            .current_dir(&self.work_dir)
            .env("XDG_CONFIG_HOME", &self.config_home)
            .env("HOME", self.temp_dir.path())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .env("GIT_CONFIG_NOSYSTEM", "1");
        cmd
    }

    /// Replace the configuration passed to every command
    pub fn write_config(&self, content: &str) -> PathBuf {
        let path = self.config_home.join("autorepo.yml");
        std::fs::write(&path, content).expect("Failed to write config");
        path
    }

    pub fn work_path(&self, relative: &str) -> PathBuf {
        self.work_dir.join(relative)
    }

    /// Directories left behind by forced backups in `dir`
    pub fn scratch_dirs_in(dir: &Path, prefix: &str) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .flatten()
                    .map(|entry| entry.path())
                    .filter(|path| {
                        path.file_name()
                            .map(|n| n.to_string_lossy().starts_with(prefix))
                            .unwrap_or(false)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Manifest entry JSON
pub fn entry_json(url: &str, name: &str, subfolder: &str, tags: &[&str]) -> String {
    serde_json::json!({
        "url": url,
        "name": name,
        "subfolder": subfolder,
        "tags": tags,
    })
    .to_string()
}

/// Manifest JSON from entry JSON fragments
pub fn manifest_json(entries: &[String]) -> String {
    format!("[{}]", entries.join(","))
}
