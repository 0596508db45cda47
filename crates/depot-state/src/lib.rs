//! Depot-State: registry storage for Agent Depot
//!
//! This crate persists the two record kinds the control plane owns:
//! registered agents and their staged working copies.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: one active staging record per `(agent_id, target)`, validation
//! state as the only mutable part of an agent.
//!
//! ## Key Components
//!
//! - `AgentStore` / `StagingStore`: async storage traits
//! - `fakes`: in-memory implementations for tests and embedding
//! - `SurrealHandle`: SurrealDB connection plus the table operations
//! - `SurrealAgentStore` / `SurrealStagingStore`: trait implementations over a shared handle

mod error;
pub mod fakes;
mod handle;
mod schema;
pub mod storage_traits;
pub mod surreal_store;

pub use error::{StateError, StorageError};
pub use handle::SurrealHandle;
pub use storage_traits::{
    AgentFilter, AgentRecord, AgentRegistration, AgentStore, CodeSource, JsonMap, StagingKey,
    StagingRecord, StagingStatus, StagingStore, StagingUpdate, StorageResult, ValidationState,
    ValidationStatus,
};
pub use surreal_store::{SurrealAgentStore, SurrealStagingStore};

/// Result type for depot-state connection setup
pub type Result<T> = std::result::Result<T, StateError>;
