//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryAgentStore` and `MemoryStagingStore` that satisfy the
//! trait contracts without any external dependencies.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StorageError;
use crate::storage_traits::*;

fn lock<T>(m: &Mutex<T>) -> StorageResult<MutexGuard<'_, T>> {
    m.lock()
        .map_err(|_| StorageError::Backend("in-memory store lock poisoned".to_string()))
}

// ---------------------------------------------------------------------------
// MemoryAgentStore
// ---------------------------------------------------------------------------

/// In-memory agent registry backed by a `Vec` in insertion order.
#[derive(Debug, Default)]
pub struct MemoryAgentStore {
    agents: Mutex<Vec<AgentRecord>>,
}

impl MemoryAgentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentStore for MemoryAgentStore {
    async fn insert(&self, record: AgentRecord) -> StorageResult<AgentRecord> {
        let mut agents = lock(&self.agents)?;
        if agents.iter().any(|a| a.id == record.id) {
            return Err(StorageError::DuplicateAgent {
                agent_id: record.id,
            });
        }
        agents.push(record.clone());
        Ok(record)
    }

    async fn get(&self, agent_id: &str) -> StorageResult<Option<AgentRecord>> {
        let agents = lock(&self.agents)?;
        Ok(agents.iter().find(|a| a.id == agent_id).cloned())
    }

    async fn find_by_name_version(
        &self,
        name: &str,
        version: &str,
    ) -> StorageResult<Option<AgentRecord>> {
        let agents = lock(&self.agents)?;
        Ok(agents
            .iter()
            .rev()
            .find(|a| a.name == name && a.version == version)
            .cloned())
    }

    async fn list(&self, filter: &AgentFilter) -> StorageResult<Vec<AgentRecord>> {
        let agents = lock(&self.agents)?;
        Ok(agents.iter().filter(|a| filter.matches(a)).cloned().collect())
    }

    async fn set_validation(
        &self,
        agent_id: &str,
        state: ValidationState,
    ) -> StorageResult<AgentRecord> {
        let mut agents = lock(&self.agents)?;
        let agent = agents
            .iter_mut()
            .find(|a| a.id == agent_id)
            .ok_or_else(|| StorageError::AgentNotFound {
                agent_id: agent_id.to_string(),
            })?;
        agent.validation = state;
        agent.updated_at = Utc::now();
        Ok(agent.clone())
    }
}

// ---------------------------------------------------------------------------
// MemoryStagingStore
// ---------------------------------------------------------------------------

/// In-memory staging store. Records are kept in creation order; deleted
/// records stay around so `list_for_agent` can show them.
#[derive(Debug, Default)]
pub struct MemoryStagingStore {
    records: Mutex<Vec<StagingRecord>>,
    upserts: Mutex<HashMap<StagingKey, usize>>,
}

impl MemoryStagingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many upserts this store has seen for a key. Test helper.
    pub fn upsert_count(&self, key: &StagingKey) -> usize {
        self.upserts
            .lock()
            .map(|m| m.get(key).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

fn active_index(records: &[StagingRecord], key: &StagingKey) -> Option<usize> {
    records
        .iter()
        .rposition(|r| r.status.is_active() && r.agent_id == key.agent_id && r.target == key.target)
}

#[async_trait]
impl StagingStore for MemoryStagingStore {
    async fn get_active(&self, key: &StagingKey) -> StorageResult<Option<StagingRecord>> {
        let records = lock(&self.records)?;
        Ok(active_index(&records, key).map(|i| records[i].clone()))
    }

    async fn upsert(&self, update: StagingUpdate) -> StorageResult<StagingRecord> {
        let now = Utc::now();
        let mut records = lock(&self.records)?;
        *lock(&self.upserts)?.entry(update.key().clone()).or_insert(0) += 1;

        if let Some(i) = active_index(&records, update.key()) {
            update.apply_to(&mut records[i], now);
            return Ok(records[i].clone());
        }

        let record = update.into_record(now);
        records.push(record.clone());
        Ok(record)
    }

    async fn latest_ready(&self, key: &StagingKey) -> StorageResult<Option<StagingRecord>> {
        let records = lock(&self.records)?;
        Ok(records
            .iter()
            .filter(|r| r.agent_id == key.agent_id && r.target == key.target)
            .filter(|r| r.status == StagingStatus::Ready)
            .max_by_key(|r| r.updated_at)
            .cloned())
    }

    async fn find_active_by_dir(&self, dir: &Path) -> StorageResult<Option<StagingRecord>> {
        let records = lock(&self.records)?;
        Ok(records
            .iter()
            .rev()
            .find(|r| r.status.is_active() && r.checkout_dir == dir)
            .cloned())
    }

    async fn list_for_agent(&self, agent_id: &str) -> StorageResult<Vec<StagingRecord>> {
        let records = lock(&self.records)?;
        Ok(records
            .iter()
            .rev()
            .filter(|r| r.agent_id == agent_id)
            .cloned()
            .collect())
    }

    async fn mark_deleted(&self, key: &StagingKey) -> StorageResult<Option<StagingRecord>> {
        let mut records = lock(&self.records)?;
        let Some(i) = active_index(&records, key) else {
            return Ok(None);
        };
        let record = &mut records[i];
        record.status = StagingStatus::Deleted;
        record.staged_path = None;
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }
}
