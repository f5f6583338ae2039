//! Git diff capture for diff-mode context queries.
//!
//! The core consumes unified-diff text; this module shells out to `git`
//! to produce it for the worktree, the staged set, or a commit range.

use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context as _, Result};

/// Captures `git diff` output for the given selection.
pub fn capture_diff(repo_root: &Path, staged: bool, commit_range: Option<&str>) -> Result<String> {
    let mut args: Vec<&str> = vec!["diff", "--no-color", "--unified=0"];
    if staged {
        args.push("--cached");
    }
    if let Some(range) = commit_range {
        args.push(range);
    }

    let output = Command::new("git")
        .args(&args)
        .current_dir(repo_root)
        .output()
        .context("failed to execute git")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "git diff failed (exit code {:?}): {}",
            output.status.code(),
            stderr.trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
