//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};

use depot_core::{DepotError, Result, SourceResolver};
use depot_state::{AgentRecord, AgentRegistration, CodeSource, JsonMap};
use serde_json::Value;

pub fn git(repo_dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
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
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Write `rel` under `repo`, creating parents, and commit it.
pub fn commit_file(repo: &Path, rel: &str, contents: &str, message: &str) -> String {
    let path = repo.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
    git(repo, &["add", rel]);
    git(repo, &["commit", "-m", message]);
    git(repo, &["rev-parse", "HEAD"])
}

/// A local upstream repository with one commit.
pub fn make_upstream() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    git(dir.path(), &["init"]);
    git(dir.path(), &["config", "user.name", "test-user"]);
    git(dir.path(), &["config", "user.email", "test@example.com"]);
    commit_file(dir.path(), "VERSION", "1", "v1");
    dir
}

pub fn file_url(dir: &Path) -> String {
    format!("file://{}", dir.display())
}

pub fn json_map(value: Value) -> JsonMap {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

pub fn registration(name: &str, repo: Option<&str>, entrypoint: Option<&str>) -> AgentRegistration {
    AgentRegistration {
        name: name.to_string(),
        version: "0.1.0".to_string(),
        code_source: repo.map(|r| CodeSource::new(r, None)),
        entrypoint: entrypoint.map(str::to_string),
        ..Default::default()
    }
}

pub fn agent(name: &str, repo: Option<&str>, entrypoint: Option<&str>) -> AgentRecord {
    AgentRecord::register(registration(name, repo, entrypoint))
}

/// Resolver that creates the destination and counts calls.
///
/// Repositories named in `failing` return `FetchFailed`.
#[derive(Default)]
pub struct CountingResolver {
    pub calls: AtomicUsize,
    pub failing: Vec<String>,
}

impl CountingResolver {
    pub fn failing_on(repo: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failing: vec![repo.to_string()],
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SourceResolver for CountingResolver {
    fn ensure_checked_out(
        &self,
        repo: &str,
        _revision: Option<&str>,
        dest: &Path,
    ) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|r| r == repo) {
            return Err(DepotError::FetchFailed(format!("cannot reach {repo}")));
        }
        std::fs::create_dir_all(dest).map_err(|e| DepotError::local_fs(dest, e))?;
        Ok(dest.to_path_buf())
    }
}
