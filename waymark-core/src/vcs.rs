//! Branch discovery for registry writes.
//!
//! A `VERSION` file in the project directory (the parent of the migrations
//! root) wins. Otherwise `git rev-parse --abbrev-ref HEAD` is asked from
//! inside the migrations root. Anything else yields `"unknown"`.

use std::path::Path;
use std::process::{Command, Stdio};

pub const UNKNOWN_BRANCH: &str = "unknown";
pub const VERSION_FILE: &str = "VERSION";

pub fn current_branch(migrations_dir: &Path) -> String {
    if let Some(version) = migrations_dir
        .parent()
        .and_then(|project| read_version_file(&project.join(VERSION_FILE)))
    {
        return version;
    }
    git_branch(migrations_dir).unwrap_or_else(|| UNKNOWN_BRANCH.to_string())
}

fn read_version_file(path: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(path).ok()?;
    let version = contents.trim();
    (!version.is_empty()).then(|| version.to_string())
}

fn git_branch(dir: &Path) -> Option<String> {
    let cwd = if dir.is_dir() { dir } else { dir.parent()? };
    let output = Command::new("git")
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .current_dir(cwd)
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if branch.is_empty() || branch == "HEAD" {
        tracing::debug!("detached or empty git HEAD");
        return None;
    }
    tracing::debug!(branch = %branch, "got git branch");
    Some(branch)
}
