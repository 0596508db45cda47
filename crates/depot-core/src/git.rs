//! Git subprocess helpers used by the source resolver.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::domain::error::{DepotError, Result};

/// Run `git` with the given arguments, optionally inside `repo_dir`.
///
/// Returns trimmed stdout. Spawn failures and non-zero exits are both
/// reported as `FetchFailed` carrying git's stderr.
pub fn run_git<I, S>(repo_dir: Option<&Path>, args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
    let rendered = args
        .iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ");

    let mut cmd = Command::new("git");
    if let Some(dir) = repo_dir {
        cmd.arg("-C").arg(dir);
    }
    cmd.args(&args).env("GIT_TERMINAL_PROMPT", "0");

    debug!(cmd = %rendered, "running git");
    let output = cmd
        .output()
        .map_err(|e| DepotError::FetchFailed(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DepotError::FetchFailed(format!(
            "git {rendered} failed ({}): {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Capture the HEAD commit SHA from a git repository.
pub fn capture_head_sha(repo_dir: &Path) -> Result<String> {
    let sha = run_git(Some(repo_dir), ["rev-parse", "HEAD"])?;
    if sha.is_empty() {
        return Err(DepotError::FetchFailed(
            "git rev-parse HEAD returned empty output".to_string(),
        ));
    }
    Ok(sha)
}

/// Whether `dir` is the top of a git working copy (has its own `.git`).
pub fn is_working_copy(dir: &Path) -> bool {
    dir.join(".git").exists()
}

/// Whether `rev` names a commit in the repository at `repo_dir`.
pub fn resolves_to_commit(repo_dir: &Path, rev: &str) -> bool {
    let spec = format!("{rev}^{{commit}}");
    run_git(
        Some(repo_dir),
        ["rev-parse", "--verify", "--quiet", spec.as_str()],
    )
    .is_ok()
}

/// URL of the `origin` remote, if configured.
pub fn origin_url(repo_dir: &Path) -> Option<String> {
    run_git(Some(repo_dir), ["remote", "get-url", "origin"]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::process::Command as StdCommand;

    fn git(repo_dir: &Path, args: &[&str]) {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(repo_dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn make_git_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        git(dir.path(), &["init"]);
        git(dir.path(), &["config", "user.name", "test-user"]);
        git(dir.path(), &["config", "user.email", "test@example.com"]);
        git(dir.path(), &["commit", "--allow-empty", "-m", "initial"]);
        dir
    }

    #[test]
    fn capture_head_sha_returns_40_hex_chars() {
        let repo = make_git_repo();
        let sha = capture_head_sha(repo.path()).unwrap();
        assert_eq!(sha.len(), 40, "SHA should be 40 hex chars, got: {sha}");
        assert!(sha.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn capture_head_sha_fails_outside_repo() {
        let dir = tempfile::tempdir().unwrap();
        let err = capture_head_sha(dir.path()).unwrap_err();
        assert!(matches!(err, DepotError::FetchFailed(_)));
    }

    #[test]
    fn working_copy_detection() {
        let repo = make_git_repo();
        assert!(is_working_copy(repo.path()));
        let plain = tempfile::tempdir().unwrap();
        assert!(!is_working_copy(plain.path()));
    }

    #[test]
    fn resolves_head_but_not_garbage() {
        let repo = make_git_repo();
        assert!(resolves_to_commit(repo.path(), "HEAD"));
        assert!(!resolves_to_commit(repo.path(), "no-such-branch"));
    }

    #[test]
    fn origin_url_absent_without_remote() {
        let repo = make_git_repo();
        assert_eq!(origin_url(repo.path()), None);
    }
}
