use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::storage_traits::{
    AgentFilter, AgentRecord, AgentStore, StagingKey, StagingRecord, StagingStore,
    StagingUpdate, StorageResult, ValidationState,
};
use crate::SurrealHandle;

/// SurrealDB-backed implementation of the AgentStore trait.
#[derive(Clone)]
pub struct SurrealAgentStore {
    handle: Arc<SurrealHandle>,
}

impl SurrealAgentStore {
    pub fn new(handle: Arc<SurrealHandle>) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl AgentStore for SurrealAgentStore {
    async fn insert(&self, record: AgentRecord) -> StorageResult<AgentRecord> {
        self.handle.agent_insert(&record).await
    }

    async fn get(&self, agent_id: &str) -> StorageResult<Option<AgentRecord>> {
        self.handle.agent_get(agent_id).await
    }

    async fn find_by_name_version(
        &self,
        name: &str,
        version: &str,
    ) -> StorageResult<Option<AgentRecord>> {
        self.handle.agent_find_by_name_version(name, version).await
    }

    async fn list(&self, filter: &AgentFilter) -> StorageResult<Vec<AgentRecord>> {
        self.handle.agent_list(filter).await
    }

    async fn set_validation(
        &self,
        agent_id: &str,
        state: ValidationState,
    ) -> StorageResult<AgentRecord> {
        self.handle.agent_set_validation(agent_id, state).await
    }
}

/// SurrealDB-backed implementation of the StagingStore trait.
#[derive(Clone)]
pub struct SurrealStagingStore {
    handle: Arc<SurrealHandle>,
}

impl SurrealStagingStore {
    pub fn new(handle: Arc<SurrealHandle>) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl StagingStore for SurrealStagingStore {
    async fn get_active(&self, key: &StagingKey) -> StorageResult<Option<StagingRecord>> {
        self.handle.staging_get_active(key).await
    }

    async fn upsert(&self, update: StagingUpdate) -> StorageResult<StagingRecord> {
        self.handle.staging_upsert(update).await
    }

    async fn latest_ready(&self, key: &StagingKey) -> StorageResult<Option<StagingRecord>> {
        self.handle.staging_latest_ready(key).await
    }

    async fn find_active_by_dir(&self, dir: &Path) -> StorageResult<Option<StagingRecord>> {
        self.handle.staging_find_active_by_dir(dir).await
    }

    async fn list_for_agent(&self, agent_id: &str) -> StorageResult<Vec<StagingRecord>> {
        self.handle.staging_list_for_agent(agent_id).await
    }

    async fn mark_deleted(&self, key: &StagingKey) -> StorageResult<Option<StagingRecord>> {
        self.handle.staging_mark_deleted(key).await
    }
}
