//! Runtime configuration for the staging and invocation pipeline.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::error::{DepotError, Result};

/// Target used by smoke validation unless overridden.
pub const DEFAULT_SAMPLE_TARGET: &str = "local-validate";

/// Target used by `run_local` unless overridden.
pub const DEFAULT_RUN_LOCAL_TARGET: &str = "local";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepotConfig {
    /// Root directory for staged checkouts.
    pub workdir: PathBuf,
    /// Skip all source-control operations; destinations are created empty.
    pub skip_vcs: bool,
    pub sample_target: String,
    pub run_local_target: String,
    /// Optional deadline for a single invocation.
    pub invoke_timeout_ms: Option<u64>,
}

impl Default for DepotConfig {
    fn default() -> Self {
        Self {
            workdir: default_workdir(),
            skip_vcs: false,
            sample_target: DEFAULT_SAMPLE_TARGET.to_string(),
            run_local_target: DEFAULT_RUN_LOCAL_TARGET.to_string(),
            invoke_timeout_ms: None,
        }
    }
}

/// `$HOME/.academy/agents`, or a relative `.academy/agents` without a home.
pub fn default_workdir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(".academy")
        .join("agents")
}

/// `1`, `true` or `yes`, case-insensitive.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

impl DepotConfig {
    /// Read configuration from the environment.
    ///
    /// Reads:
    /// - AGENTS_WORKDIR (default: `$HOME/.academy/agents`)
    /// - AGENTS_SKIP_GIT (`1`/`true`/`yes`)
    /// - AGENTS_SAMPLE_TARGET (default: `local-validate`)
    /// - AGENTS_INVOKE_TIMEOUT_MS (optional)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`DepotConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(dir) = lookup("AGENTS_WORKDIR").filter(|v| !v.trim().is_empty()) {
            config.workdir = PathBuf::from(dir);
        }
        if let Some(flag) = lookup("AGENTS_SKIP_GIT") {
            config.skip_vcs = parse_flag(&flag);
        }
        if let Some(target) = lookup("AGENTS_SAMPLE_TARGET").filter(|v| !v.trim().is_empty()) {
            config.sample_target = target.trim().to_string();
        }
        if let Some(raw) = lookup("AGENTS_INVOKE_TIMEOUT_MS").filter(|v| !v.trim().is_empty()) {
            let ms = raw.trim().parse::<u64>().map_err(|e| {
                DepotError::Config(format!("AGENTS_INVOKE_TIMEOUT_MS={raw:?}: {e}"))
            })?;
            config.invoke_timeout_ms = Some(ms);
        }

        Ok(config)
    }

    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    pub fn with_skip_vcs(mut self, skip_vcs: bool) -> Self {
        self.skip_vcs = skip_vcs;
        self
    }

    pub fn with_sample_target(mut self, target: impl Into<String>) -> Self {
        self.sample_target = target.into();
        self
    }

    pub fn with_run_local_target(mut self, target: impl Into<String>) -> Self {
        self.run_local_target = target.into();
        self
    }

    pub fn with_invoke_timeout_ms(mut self, ms: Option<u64>) -> Self {
        self.invoke_timeout_ms = ms;
        self
    }

    pub fn invoke_timeout(&self) -> Option<Duration> {
        self.invoke_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = DepotConfig::from_lookup(|_| None).unwrap();
        assert!(!config.skip_vcs);
        assert_eq!(config.sample_target, "local-validate");
        assert_eq!(config.run_local_target, "local");
        assert!(config.workdir.ends_with(".academy/agents"));
        assert_eq!(config.invoke_timeout(), None);
    }

    #[test]
    fn reads_overrides() {
        let config = DepotConfig::from_lookup(lookup_from(&[
            ("AGENTS_WORKDIR", "/srv/agents"),
            ("AGENTS_SKIP_GIT", "YES"),
            ("AGENTS_SAMPLE_TARGET", "smoke"),
            ("AGENTS_INVOKE_TIMEOUT_MS", "2500"),
        ]))
        .unwrap();
        assert_eq!(config.workdir, PathBuf::from("/srv/agents"));
        assert!(config.skip_vcs);
        assert_eq!(config.sample_target, "smoke");
        assert_eq!(config.invoke_timeout(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn skip_flag_accepts_only_truthy_words() {
        for v in ["1", "true", "True", " yes "] {
            assert!(parse_flag(v), "{v}");
        }
        for v in ["0", "false", "no", "on", ""] {
            assert!(!parse_flag(v), "{v}");
        }
    }

    #[test]
    fn bad_timeout_is_a_config_error() {
        let err = DepotConfig::from_lookup(lookup_from(&[("AGENTS_INVOKE_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, DepotError::Config(_)));
    }
}
