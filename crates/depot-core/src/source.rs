//! Code Source Resolver: materialize a repository revision into a directory.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::domain::error::{DepotError, Result};
use crate::git;

/// Ensures a working copy of a repository revision exists at a destination.
///
/// Implementations block; callers on an async runtime should use
/// `spawn_blocking`.
pub trait SourceResolver: Send + Sync {
    /// Make `dest` hold `repo` at `revision` (default branch head when
    /// `None`) and return the directory.
    fn ensure_checked_out(&self, repo: &str, revision: Option<&str>, dest: &Path)
        -> Result<PathBuf>;
}

/// `git` command-line backed resolver.
#[derive(Debug, Clone, Default)]
pub struct GitSourceResolver {
    skip_vcs: bool,
}

impl GitSourceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hermetic mode: no git at all, the destination is only created.
    pub fn skipping_vcs(skip_vcs: bool) -> Self {
        Self { skip_vcs }
    }

    pub fn skips_vcs(&self) -> bool {
        self.skip_vcs
    }

    fn checkout_target(dest: &Path, revision: Option<&str>) -> Result<String> {
        if let Some(rev) = revision {
            if rev.starts_with('-') {
                return Err(DepotError::FetchFailed(format!("invalid revision {rev:?}")));
            }
            // Prefer the freshly fetched remote branch over a stale local one.
            let remote = format!("origin/{rev}");
            if git::resolves_to_commit(dest, &remote) {
                return Ok(remote);
            }
            return Ok(rev.to_string());
        }

        if git::resolves_to_commit(dest, "origin/HEAD") {
            return Ok("origin/HEAD".to_string());
        }
        if git::run_git(Some(dest), ["remote", "set-head", "origin", "--auto"]).is_ok()
            && git::resolves_to_commit(dest, "origin/HEAD")
        {
            return Ok("origin/HEAD".to_string());
        }
        Ok("HEAD".to_string())
    }
}

fn remove_path(path: &Path) -> Result<()> {
    let removed = if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    removed.map_err(|e| DepotError::local_fs(path, e))
}

impl SourceResolver for GitSourceResolver {
    #[instrument(skip(self), fields(dest = %dest.display(), skip_vcs = self.skip_vcs))]
    fn ensure_checked_out(
        &self,
        repo: &str,
        revision: Option<&str>,
        dest: &Path,
    ) -> Result<PathBuf> {
        let repo = repo.trim();
        if repo.is_empty() {
            return Err(DepotError::SourceUnavailable(
                "agent does not specify a code repository; cannot stage".to_string(),
            ));
        }
        let revision = revision.map(str::trim).filter(|r| !r.is_empty());

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DepotError::local_fs(parent, e))?;
        }

        if self.skip_vcs {
            std::fs::create_dir_all(dest).map_err(|e| DepotError::local_fs(dest, e))?;
            debug!("vcs skipped, destination created");
            return Ok(dest.to_path_buf());
        }

        if dest.exists() && !git::is_working_copy(dest) {
            warn!("destination exists but is not a working copy, removing");
            remove_path(dest)?;
        } else if dest.exists() {
            let current = git::origin_url(dest);
            if current.as_deref() != Some(repo) {
                warn!(
                    previous = current.as_deref().unwrap_or("<none>"),
                    "working copy tracks a different repository, re-cloning"
                );
                remove_path(dest)?;
            }
        }

        if dest.exists() {
            git::run_git(Some(dest), ["fetch", "--prune", "--tags", "origin"])?;
        } else {
            git::run_git(
                None,
                [
                    std::ffi::OsStr::new("clone"),
                    std::ffi::OsStr::new("--"),
                    std::ffi::OsStr::new(repo),
                    dest.as_os_str(),
                ],
            )?;
        }

        let target = Self::checkout_target(dest, revision)?;
        git::run_git(Some(dest), ["checkout", "--force", "--detach", target.as_str()])?;

        match git::capture_head_sha(dest) {
            Ok(sha) => info!(revision = %target, head = %sha, "working copy ready"),
            Err(e) => warn!(error = %e, "could not read checked out revision"),
        }
        Ok(dest.to_path_buf())
    }
}
