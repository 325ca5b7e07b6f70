//! Local git fixtures shared by unit tests

use std::path::{Path, PathBuf};
use std::process::Command;

/// Whether a usable `git` executable is on the PATH
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn git(cwd: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(["-c", "user.name=autorepo", "-c", "user.email=autorepo@example.com"])
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Create `parent/name` as a repository with one commit
pub fn init_origin(parent: &Path, name: &str) -> PathBuf {
    let path = parent.join(name);
    std::fs::create_dir_all(&path).expect("failed to create origin dir");
    git(&path, &["init", "--quiet"]);
    commit_file(&path, "README.md", name);
    path
}

/// Write `file` with `contents` and commit it
pub fn commit_file(repo: &Path, file: &str, contents: &str) {
    std::fs::write(repo.join(file), contents).expect("failed to write fixture file");
    git(repo, &["add", file]);
    git(repo, &["commit", "--quiet", "-m", contents]);
}
