//! Domain-level error taxonomy for Agent Depot.
//!
//! Every failure carries a stable [`ErrorKind`] so an API layer can pick a
//! status code via [`ErrorKind::class`] without reading the message.

use depot_state::StorageError;
use serde::{Deserialize, Serialize};

/// Agent Depot domain errors.
#[derive(Debug, thiserror::Error)]
pub enum DepotError {
    // ---- staging ----
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("fetch failed: {0}")]
    FetchFailed(String),

    #[error("local filesystem error at {path}: {message}")]
    LocalFs { path: String, message: String },

    // ---- resolution ----
    #[error("malformed entrypoint {entrypoint:?}: expected 'module:attr'")]
    MalformedEntrypoint { entrypoint: String },

    #[error("cannot load module '{module}': {reason}")]
    ModuleLoad { module: String, reason: String },

    #[error("module '{module}' has no attribute '{attribute}'")]
    AttributeNotFound { module: String, attribute: String },

    // ---- invocation ----
    #[error("construction of '{unit}' failed: {message}")]
    Construction { unit: String, message: String },

    #[error("entry class '{unit}' has no run method")]
    MissingRunMethod { unit: String },

    #[error("agent execution failed: {0}")]
    AgentExecution(String),

    #[error("agent run must return a mapping, got {actual}")]
    InvalidResultShape { actual: String },

    // ---- orchestration ----
    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("no ready staging for agent {agent_id} on target '{target}'{}", reason_suffix(.reason))]
    NoReadyStaging {
        agent_id: String,
        target: String,
        reason: Option<String>,
    },

    #[error("agent {0} has no entrypoint; cannot run")]
    NoEntrypoint(String),

    // ---- ambient ----
    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("internal error: {0}")]
    Internal(String),
}

fn reason_suffix(reason: &Option<String>) -> String {
    match reason {
        Some(r) if !r.is_empty() => format!(": {r}"),
        _ => String::new(),
    }
}

impl DepotError {
    pub fn local_fs(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        DepotError::LocalFs {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// Stable machine-readable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DepotError::SourceUnavailable(_) => ErrorKind::SourceUnavailable,
            DepotError::FetchFailed(_) => ErrorKind::FetchFailed,
            DepotError::LocalFs { .. } => ErrorKind::LocalFsError,
            DepotError::MalformedEntrypoint { .. } => ErrorKind::MalformedEntrypoint,
            DepotError::ModuleLoad { .. } => ErrorKind::ModuleLoadError,
            DepotError::AttributeNotFound { .. } => ErrorKind::AttributeNotFound,
            DepotError::Construction { .. } => ErrorKind::ConstructionError,
            DepotError::MissingRunMethod { .. } => ErrorKind::MissingRunMethod,
            DepotError::AgentExecution(_) => ErrorKind::AgentExecutionError,
            DepotError::InvalidResultShape { .. } => ErrorKind::InvalidResultShape,
            DepotError::AgentNotFound(_) => ErrorKind::AgentNotFound,
            DepotError::NoReadyStaging { .. } => ErrorKind::NoReadyStaging,
            DepotError::NoEntrypoint(_) => ErrorKind::NoEntrypoint,
            DepotError::Config(_) => ErrorKind::Config,
            DepotError::Serialization(_) => ErrorKind::Serialization,
            DepotError::Storage(StorageError::AgentNotFound { .. }) => ErrorKind::AgentNotFound,
            DepotError::Storage(StorageError::DuplicateAgent { .. }) => ErrorKind::DuplicateAgent,
            DepotError::Storage(_) => ErrorKind::Storage,
            DepotError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Stable error kinds, one per distinguishable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SourceUnavailable,
    FetchFailed,
    LocalFsError,
    MalformedEntrypoint,
    ModuleLoadError,
    AttributeNotFound,
    ConstructionError,
    MissingRunMethod,
    AgentExecutionError,
    InvalidResultShape,
    AgentNotFound,
    NoReadyStaging,
    NoEntrypoint,
    DuplicateAgent,
    Config,
    Serialization,
    Storage,
    Internal,
}

/// Coarse grouping used to choose a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    NotFound,
    Conflict,
    InvalidInput,
    Upstream,
    AgentFault,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::SourceUnavailable => "source_unavailable",
            ErrorKind::FetchFailed => "fetch_failed",
            ErrorKind::LocalFsError => "local_fs_error",
            ErrorKind::MalformedEntrypoint => "malformed_entrypoint",
            ErrorKind::ModuleLoadError => "module_load_error",
            ErrorKind::AttributeNotFound => "attribute_not_found",
            ErrorKind::ConstructionError => "construction_error",
            ErrorKind::MissingRunMethod => "missing_run_method",
            ErrorKind::AgentExecutionError => "agent_execution_error",
            ErrorKind::InvalidResultShape => "invalid_result_shape",
            ErrorKind::AgentNotFound => "agent_not_found",
            ErrorKind::NoReadyStaging => "no_ready_staging",
            ErrorKind::NoEntrypoint => "no_entrypoint",
            ErrorKind::DuplicateAgent => "duplicate_agent",
            ErrorKind::Config => "config",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Storage => "storage",
            ErrorKind::Internal => "internal",
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            ErrorKind::AgentNotFound => ErrorClass::NotFound,
            ErrorKind::NoReadyStaging | ErrorKind::DuplicateAgent => ErrorClass::Conflict,
            ErrorKind::SourceUnavailable
            | ErrorKind::MalformedEntrypoint
            | ErrorKind::NoEntrypoint
            | ErrorKind::Config => ErrorClass::InvalidInput,
            ErrorKind::FetchFailed => ErrorClass::Upstream,
            ErrorKind::ModuleLoadError
            | ErrorKind::AttributeNotFound
            | ErrorKind::ConstructionError
            | ErrorKind::MissingRunMethod
            | ErrorKind::AgentExecutionError
            | ErrorKind::InvalidResultShape => ErrorClass::AgentFault,
            ErrorKind::LocalFsError
            | ErrorKind::Serialization
            | ErrorKind::Storage
            | ErrorKind::Internal => ErrorClass::Internal,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type for Agent Depot domain operations.
pub type Result<T> = std::result::Result<T, DepotError>;
