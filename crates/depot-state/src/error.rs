//! Error types for depot-state

use thiserror::Error;

/// Errors that can occur while setting up the registry database
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

/// Errors returned by the `AgentStore` / `StagingStore` traits
#[derive(Error, Debug)]
pub enum StorageError {
    /// No agent with the given id
    #[error("agent not found: {agent_id}")]
    AgentNotFound { agent_id: String },

    /// An agent with the same id is already registered
    #[error("agent already registered: {agent_id}")]
    DuplicateAgent { agent_id: String },

    /// A record could not be encoded or decoded
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Backend failure (query, transaction, lock poisoning)
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<surrealdb::Error> for StorageError {
    fn from(err: surrealdb::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Connection(err.to_string())
    }
}
