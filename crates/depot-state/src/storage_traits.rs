//! Storage trait definitions for Agent Depot
//!
//! These traits define the registry storage abstractions:
//! - `AgentStore`: Agent records (registration, lookup, validation state)
//! - `StagingStore`: Staging records keyed by `(agent_id, target)`
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// String-keyed JSON mapping used for agent inputs and outputs.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Agent records
// ---------------------------------------------------------------------------

/// Where an agent's code can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSource {
    /// Repository URL (anything `git clone` accepts, including `file://`)
    pub repo: String,
    /// Pinned revision (commit, tag or branch). `None` tracks the default branch.
    #[serde(default)]
    pub revision: Option<String>,
}

impl CodeSource {
    /// Build a code source, normalizing an empty revision to `None`.
    pub fn new(repo: impl Into<String>, revision: Option<String>) -> Self {
        let revision = revision
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        Self {
            repo: repo.into(),
            revision,
        }
    }

    /// The pinned revision, if any non-blank one was given.
    pub fn pinned_revision(&self) -> Option<&str> {
        self.revision
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }
}

/// Validation lifecycle of an agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    #[default]
    Unvalidated,
    Validated,
    Failed,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Unvalidated => "unvalidated",
            ValidationStatus::Validated => "validated",
            ValidationStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unvalidated" => Some(ValidationStatus::Unvalidated),
            "validated" => Some(ValidationStatus::Validated),
            "failed" => Some(ValidationStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted result of the most recent smoke validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationState {
    pub status: ValidationStatus,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub last_validated_at: Option<DateTime<Utc>>,
    /// Failure description when `status` is `Failed`
    #[serde(default)]
    pub reason: Option<String>,
}

impl ValidationState {
    pub fn validated(score: Option<f64>, at: DateTime<Utc>) -> Self {
        Self {
            status: ValidationStatus::Validated,
            score,
            last_validated_at: Some(at),
            reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            status: ValidationStatus::Failed,
            score: None,
            last_validated_at: Some(at),
            reason: Some(reason.into()),
        }
    }
}

/// Input for registering a new agent.
///
/// Accepts the legacy `validation_inputs` name for `sample_inputs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentRegistration {
    /// Caller-assigned id; a UUID is generated when absent
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub agent_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub inputs_schema: serde_json::Value,
    #[serde(default)]
    pub outputs_schema: serde_json::Value,
    #[serde(default)]
    pub code_source: Option<CodeSource>,
    #[serde(default)]
    pub container_image: Option<String>,
    /// `module_reference:attribute_name`
    #[serde(default)]
    pub entrypoint: Option<String>,
    #[serde(default, alias = "validation_inputs")]
    pub sample_inputs: Option<JsonMap>,
}

/// A registered agent.
///
/// Immutable once created except for `validation`; re-registration
/// creates a new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub agent_type: String,
    pub tags: Vec<String>,
    pub inputs_schema: serde_json::Value,
    pub outputs_schema: serde_json::Value,
    pub code_source: Option<CodeSource>,
    pub container_image: Option<String>,
    pub entrypoint: Option<String>,
    pub sample_inputs: Option<JsonMap>,
    pub validation: ValidationState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentRecord {
    /// Turn a registration into a fresh, unvalidated record.
    pub fn register(reg: AgentRegistration) -> Self {
        let now = Utc::now();
        let id = reg
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let code_source = reg
            .code_source
            .map(|src| CodeSource::new(src.repo, src.revision));
        let container_image = reg.container_image.filter(|s| !s.trim().is_empty());
        let entrypoint = reg.entrypoint.filter(|s| !s.trim().is_empty());

        Self {
            id,
            name: reg.name,
            version: reg.version,
            description: reg.description,
            agent_type: reg.agent_type,
            tags: reg.tags,
            inputs_schema: reg.inputs_schema,
            outputs_schema: reg.outputs_schema,
            code_source,
            container_image,
            entrypoint,
            sample_inputs: reg.sample_inputs,
            validation: ValidationState::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// `name@version`, used in logs and CLI output.
    pub fn display_name(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

/// Filter for [`AgentStore::list`]. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentFilter {
    pub name: Option<String>,
    pub agent_type: Option<String>,
    pub tag: Option<String>,
}

impl AgentFilter {
    pub fn matches(&self, agent: &AgentRecord) -> bool {
        if let Some(name) = &self.name {
            if &agent.name != name {
                return false;
            }
        }
        if let Some(agent_type) = &self.agent_type {
            if &agent.agent_type != agent_type {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !agent.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        true
    }
}

/// Agent registry storage.
///
/// Semantics:
/// - `insert` never overwrites; a duplicate id is rejected.
/// - `find_by_name_version` returns the newest match when several exist.
/// - `list` returns records oldest first.
/// - `set_validation` is the only mutation of an existing record.
#[async_trait]
pub trait AgentStore: Send + Sync {
    /// Store a newly registered agent.
    async fn insert(&self, record: AgentRecord) -> StorageResult<AgentRecord>;

    /// Fetch an agent by id.
    async fn get(&self, agent_id: &str) -> StorageResult<Option<AgentRecord>>;

    /// Newest agent with the given name and version.
    async fn find_by_name_version(
        &self,
        name: &str,
        version: &str,
    ) -> StorageResult<Option<AgentRecord>>;

    /// List agents matching the filter.
    async fn list(&self, filter: &AgentFilter) -> StorageResult<Vec<AgentRecord>>;

    /// Replace the validation state. Fails with `AgentNotFound` for unknown ids.
    async fn set_validation(
        &self,
        agent_id: &str,
        state: ValidationState,
    ) -> StorageResult<AgentRecord>;
}

// ---------------------------------------------------------------------------
// Staging records
// ---------------------------------------------------------------------------

/// Natural key of a staging record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StagingKey {
    pub agent_id: String,
    pub target: String,
}

impl StagingKey {
    pub fn new(agent_id: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            target: target.into(),
        }
    }
}

impl std::fmt::Display for StagingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.agent_id, self.target)
    }
}

/// Status of a staging record.
///
/// `requested → ready | failed`, `ready → ready | failed`,
/// any state `→ deleted` through [`StagingStore::mark_deleted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StagingStatus {
    Requested,
    Ready,
    Failed,
    Deleted,
}

impl StagingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StagingStatus::Requested => "requested",
            StagingStatus::Ready => "ready",
            StagingStatus::Failed => "failed",
            StagingStatus::Deleted => "deleted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "requested" => Some(StagingStatus::Requested),
            "ready" => Some(StagingStatus::Ready),
            "failed" => Some(StagingStatus::Failed),
            "deleted" => Some(StagingStatus::Deleted),
            _ => None,
        }
    }

    /// Every status except `Deleted` counts as active.
    pub fn is_active(&self) -> bool {
        *self != StagingStatus::Deleted
    }
}

impl std::fmt::Display for StagingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Materialized code of one agent for one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagingRecord {
    pub staging_id: String,
    pub agent_id: String,
    pub target: String,
    pub status: StagingStatus,
    /// Destination directory reserved for this pair
    pub checkout_dir: PathBuf,
    /// Set only when `status` is `Ready`
    pub staged_path: Option<PathBuf>,
    /// Set only when `status` is `Failed`
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StagingRecord {
    pub fn key(&self) -> StagingKey {
        StagingKey::new(self.agent_id.clone(), self.target.clone())
    }

    pub fn is_ready(&self) -> bool {
        self.status == StagingStatus::Ready && self.staged_path.is_some()
    }
}

/// A create-or-update request for [`StagingStore::upsert`].
///
/// The constructors keep `staged_path` / `last_error` consistent with the
/// status; the fields stay private for that reason.
#[derive(Debug, Clone, PartialEq)]
pub struct StagingUpdate {
    key: StagingKey,
    checkout_dir: PathBuf,
    status: StagingStatus,
    staged_path: Option<PathBuf>,
    last_error: Option<String>,
}

impl StagingUpdate {
    pub fn requested(key: StagingKey, checkout_dir: impl Into<PathBuf>) -> Self {
        Self {
            key,
            checkout_dir: checkout_dir.into(),
            status: StagingStatus::Requested,
            staged_path: None,
            last_error: None,
        }
    }

    pub fn ready(
        key: StagingKey,
        checkout_dir: impl Into<PathBuf>,
        staged_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            key,
            checkout_dir: checkout_dir.into(),
            status: StagingStatus::Ready,
            staged_path: Some(staged_path.into()),
            last_error: None,
        }
    }

    pub fn failed(
        key: StagingKey,
        checkout_dir: impl Into<PathBuf>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            key,
            checkout_dir: checkout_dir.into(),
            status: StagingStatus::Failed,
            staged_path: None,
            last_error: Some(error.into()),
        }
    }

    pub fn key(&self) -> &StagingKey {
        &self.key
    }

    pub fn checkout_dir(&self) -> &Path {
        &self.checkout_dir
    }

    pub fn status(&self) -> StagingStatus {
        self.status
    }

    pub fn staged_path(&self) -> Option<&Path> {
        self.staged_path.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Apply this update to an existing record in place.
    pub fn apply_to(&self, record: &mut StagingRecord, now: DateTime<Utc>) {
        record.status = self.status;
        record.checkout_dir = self.checkout_dir.clone();
        record.staged_path = self.staged_path.clone();
        record.last_error = self.last_error.clone();
        record.updated_at = now;
    }

    /// Materialize this update as a brand-new record.
    pub fn into_record(self, now: DateTime<Utc>) -> StagingRecord {
        StagingRecord {
            staging_id: uuid::Uuid::new_v4().to_string(),
            agent_id: self.key.agent_id,
            target: self.key.target,
            status: self.status,
            checkout_dir: self.checkout_dir,
            staged_path: self.staged_path,
            last_error: self.last_error,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Staging record storage.
///
/// Guarantees:
/// - At most one active (non-deleted) record exists per `StagingKey`.
/// - `upsert` updates the active record in place when one exists and
///   creates a record otherwise; it never duplicates.
/// - `latest_ready` never returns a deleted or failed record.
#[async_trait]
pub trait StagingStore: Send + Sync {
    /// The active record for a key, if any.
    async fn get_active(&self, key: &StagingKey) -> StorageResult<Option<StagingRecord>>;

    /// Create-or-update by natural key.
    async fn upsert(&self, update: StagingUpdate) -> StorageResult<StagingRecord>;

    /// Most recent record for the key whose status is `Ready`.
    async fn latest_ready(&self, key: &StagingKey) -> StorageResult<Option<StagingRecord>>;

    /// The active record that owns a checkout directory, if any.
    async fn find_active_by_dir(&self, dir: &Path) -> StorageResult<Option<StagingRecord>>;

    /// All records for an agent, newest first, deleted ones included.
    async fn list_for_agent(&self, agent_id: &str) -> StorageResult<Vec<StagingRecord>>;

    /// Flip the active record to `Deleted`. Returns the deleted record, or
    /// `None` when the key had no active record.
    async fn mark_deleted(&self, key: &StagingKey) -> StorageResult<Option<StagingRecord>>;
}
