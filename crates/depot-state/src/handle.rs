//! SurrealDB Handle - Connection and Operations
//!
//! Manages the connection and provides the raw table operations behind
//! `SurrealAgentStore` and `SurrealStagingStore`:
//! - agent insert / lookup / listing / validation updates
//! - staging create / update / lookup by key or directory
//!
//! Supports local (in-memory, surrealkv) and remote (WebSocket) engines.

use std::path::Path;

use chrono::Utc;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info, instrument};

use crate::error::{StateError, StorageError};
use crate::schema::{AgentRow, StagingRow};
use crate::storage_traits::{
    AgentFilter, AgentRecord, StagingKey, StagingRecord, StagingUpdate, StorageResult,
    ValidationState,
};
use crate::Result;

const NAMESPACE: &str = "depot";
const DATABASE: &str = "registry";

/// SurrealDB connection handle for Agent Depot
#[derive(Clone)]
pub struct SurrealHandle {
    db: Surreal<Any>,
}

fn backend(e: surrealdb::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

impl SurrealHandle {
    /// Connect to SurrealDB in-memory and set up schema
    #[instrument(skip_all)]
    pub async fn setup_db() -> Result<Self> {
        info!("Connecting to SurrealDB (in-memory)");
        let handle = Self::connect("mem://").await?;
        info!("SurrealDB connected and schema initialized");
        Ok(handle)
    }

    /// Connect to any engine URL understood by `surrealdb::engine::any`
    /// (`mem://`, `surrealkv://path`, `ws://host:port`).
    #[instrument(skip_all, fields(url = %url))]
    pub async fn connect(url: &str) -> Result<Self> {
        let db = surrealdb::engine::any::connect(url)
            .await
            .map_err(|e| StateError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| {
                StateError::Connection(format!("Failed to select namespace/database: {}", e))
            })?;

        let handle = SurrealHandle { db };
        handle.init_schema().await?;
        Ok(handle)
    }

    /// Connect using environment variables
    ///
    /// If SURREALDB_URL is set, connects to that URL.
    /// Otherwise, falls back to in-memory.
    #[instrument(skip_all)]
    pub async fn setup_from_env() -> Result<Self> {
        match std::env::var("SURREALDB_URL") {
            Ok(url) if !url.trim().is_empty() => {
                info!("SURREALDB_URL found, connecting to {}", url);
                Self::connect(url.trim()).await
            }
            _ => {
                info!("SURREALDB_URL not set, using in-memory database");
                Self::setup_db().await
            }
        }
    }

    /// Initialize the database schema
    async fn init_schema(&self) -> Result<()> {
        debug!("Initializing registry schema");

        let schema = r#"
            -- Agents table
            DEFINE TABLE agents SCHEMAFULL;
            DEFINE FIELD agent_id ON agents TYPE string;
            DEFINE FIELD name ON agents TYPE string;
            DEFINE FIELD version ON agents TYPE string;
            DEFINE FIELD description ON agents TYPE string;
            DEFINE FIELD agent_type ON agents TYPE string;
            DEFINE FIELD tags ON agents TYPE array<string>;
            DEFINE FIELD inputs_schema ON agents TYPE string;
            DEFINE FIELD outputs_schema ON agents TYPE string;
            DEFINE FIELD code_repo ON agents TYPE option<string>;
            DEFINE FIELD code_revision ON agents TYPE option<string>;
            DEFINE FIELD container_image ON agents TYPE option<string>;
            DEFINE FIELD entrypoint ON agents TYPE option<string>;
            DEFINE FIELD sample_inputs ON agents TYPE option<string>;
            DEFINE FIELD validation_status ON agents TYPE string;
            DEFINE FIELD validation_score ON agents TYPE option<float>;
            DEFINE FIELD last_validated_at ON agents TYPE option<datetime>;
            DEFINE FIELD validation_reason ON agents TYPE option<string>;
            DEFINE FIELD created_at ON agents TYPE datetime;
            DEFINE FIELD updated_at ON agents TYPE datetime;
            DEFINE INDEX idx_agent_id ON agents FIELDS agent_id UNIQUE;
            DEFINE INDEX idx_agent_name_version ON agents FIELDS name, version;

            -- Staging records
            DEFINE TABLE stagings SCHEMAFULL;
            DEFINE FIELD staging_id ON stagings TYPE string;
            DEFINE FIELD agent_id ON stagings TYPE string;
            DEFINE FIELD target ON stagings TYPE string;
            DEFINE FIELD status ON stagings TYPE string;
            DEFINE FIELD checkout_dir ON stagings TYPE string;
            DEFINE FIELD staged_path ON stagings TYPE option<string>;
            DEFINE FIELD last_error ON stagings TYPE option<string>;
            DEFINE FIELD created_at ON stagings TYPE datetime;
            DEFINE FIELD updated_at ON stagings TYPE datetime;
            DEFINE INDEX idx_staging_id ON stagings FIELDS staging_id UNIQUE;
            DEFINE INDEX idx_staging_key ON stagings FIELDS agent_id, target;
            DEFINE INDEX idx_staging_dir ON stagings FIELDS checkout_dir;
        "#;

        self.db
            .query(schema)
            .await
            .map_err(|e| StateError::SchemaSetup(e.to_string()))?;

        debug!("Schema initialized successfully");
        Ok(())
    }

    /// Check connection health
    pub async fn health_check(&self) -> Result<bool> {
        self.db.query("INFO FOR DB").await?;
        Ok(true)
    }

    // ========== Agent Operations ==========

    /// Insert a new agent record. Rejects duplicate ids.
    #[instrument(skip(self, record), fields(agent_id = %record.id, name = %record.name))]
    pub async fn agent_insert(&self, record: &AgentRecord) -> StorageResult<AgentRecord> {
        if self.agent_get(&record.id).await?.is_some() {
            return Err(StorageError::DuplicateAgent {
                agent_id: record.id.clone(),
            });
        }

        let row = AgentRow::from_record(record)?;
        let created: Option<AgentRow> = self
            .db
            .create("agents")
            .content(row)
            .await
            .map_err(backend)?;

        let created = created
            .ok_or_else(|| StorageError::Backend("failed to create agent record".to_string()))?;
        debug!("Agent stored");
        created.into_record()
    }

    /// Get an agent by id
    #[instrument(skip(self))]
    pub async fn agent_get(&self, agent_id: &str) -> StorageResult<Option<AgentRecord>> {
        let id_owned = agent_id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM agents WHERE agent_id = $id")
            .bind(("id", id_owned))
            .await
            .map_err(backend)?;

        let rows: Vec<AgentRow> = result.take(0).map_err(backend)?;
        rows.into_iter().next().map(AgentRow::into_record).transpose()
    }

    /// Newest agent with the given name and version
    #[instrument(skip(self))]
    pub async fn agent_find_by_name_version(
        &self,
        name: &str,
        version: &str,
    ) -> StorageResult<Option<AgentRecord>> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM agents WHERE name = $name AND version = $version \
                 ORDER BY created_at DESC LIMIT 1",
            )
            .bind(("name", name.to_string()))
            .bind(("version", version.to_string()))
            .await
            .map_err(backend)?;

        let rows: Vec<AgentRow> = result.take(0).map_err(backend)?;
        rows.into_iter().next().map(AgentRow::into_record).transpose()
    }

    /// List agents (oldest first) matching the filter
    #[instrument(skip(self))]
    pub async fn agent_list(&self, filter: &AgentFilter) -> StorageResult<Vec<AgentRecord>> {
        let mut result = self
            .db
            .query("SELECT * FROM agents ORDER BY created_at ASC")
            .await
            .map_err(backend)?;

        let rows: Vec<AgentRow> = result.take(0).map_err(backend)?;
        let mut agents = Vec::with_capacity(rows.len());
        for row in rows {
            let record = row.into_record()?;
            if filter.matches(&record) {
                agents.push(record);
            }
        }
        Ok(agents)
    }

    /// Replace the validation state of an agent
    #[instrument(skip(self, state), fields(status = %state.status))]
    pub async fn agent_set_validation(
        &self,
        agent_id: &str,
        state: ValidationState,
    ) -> StorageResult<AgentRecord> {
        let mut record = self
            .agent_get(agent_id)
            .await?
            .ok_or_else(|| StorageError::AgentNotFound {
                agent_id: agent_id.to_string(),
            })?;
        record.validation = state;
        record.updated_at = Utc::now();
        let row = AgentRow::from_record(&record)?;

        let mut result = self
            .db
            .query(
                "UPDATE agents SET \
                 validation_status = $status, \
                 validation_score = $score, \
                 last_validated_at = $validated_at, \
                 validation_reason = $reason, \
                 updated_at = $updated_at \
                 WHERE agent_id = $id RETURN AFTER",
            )
            .bind(("status", row.validation_status.clone()))
            .bind(("score", row.validation_score))
            .bind((
                "validated_at",
                row.last_validated_at.map(surrealdb::sql::Datetime::from),
            ))
            .bind(("reason", row.validation_reason.clone()))
            .bind(("updated_at", surrealdb::sql::Datetime::from(row.updated_at)))
            .bind(("id", agent_id.to_string()))
            .await
            .map_err(backend)?;

        let rows: Vec<AgentRow> = result.take(0).map_err(backend)?;
        let updated = rows
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::AgentNotFound {
                agent_id: agent_id.to_string(),
            })?;
        info!(agent_id = %agent_id, "validation state updated");
        updated.into_record()
    }

    // ========== Staging Operations ==========

    /// The active (non-deleted) staging record for a key
    #[instrument(skip(self), fields(key = %key))]
    pub async fn staging_get_active(&self, key: &StagingKey) -> StorageResult<Option<StagingRecord>> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM stagings WHERE agent_id = $agent_id AND target = $target \
                 AND status != 'deleted' ORDER BY updated_at DESC LIMIT 1",
            )
            .bind(("agent_id", key.agent_id.clone()))
            .bind(("target", key.target.clone()))
            .await
            .map_err(backend)?;

        let rows: Vec<StagingRow> = result.take(0).map_err(backend)?;
        rows.into_iter().next().map(StagingRow::into_record).transpose()
    }

    /// Create-or-update the active staging record for the update's key
    #[instrument(skip(self, update), fields(key = %update.key(), status = %update.status()))]
    pub async fn staging_upsert(&self, update: StagingUpdate) -> StorageResult<StagingRecord> {
        let now = Utc::now();

        if let Some(mut existing) = self.staging_get_active(update.key()).await? {
            update.apply_to(&mut existing, now);
            self.staging_write(&existing).await?;
            debug!(staging_id = %existing.staging_id, "staging record updated");
            return Ok(existing);
        }

        let record = update.into_record(now);
        let created: Option<StagingRow> = self
            .db
            .create("stagings")
            .content(StagingRow::from_record(&record))
            .await
            .map_err(backend)?;

        let created = created
            .ok_or_else(|| StorageError::Backend("failed to create staging record".to_string()))?;
        debug!(staging_id = %created.staging_id, "staging record created");
        created.into_record()
    }

    /// Overwrite the mutable columns of an existing staging row
    async fn staging_write(&self, record: &StagingRecord) -> StorageResult<()> {
        let row = StagingRow::from_record(record);
        self.db
            .query(
                "UPDATE stagings SET \
                 status = $status, \
                 checkout_dir = $checkout_dir, \
                 staged_path = $staged_path, \
                 last_error = $last_error, \
                 updated_at = $updated_at \
                 WHERE staging_id = $staging_id",
            )
            .bind(("status", row.status))
            .bind(("checkout_dir", row.checkout_dir))
            .bind(("staged_path", row.staged_path))
            .bind(("last_error", row.last_error))
            .bind(("updated_at", surrealdb::sql::Datetime::from(row.updated_at)))
            .bind(("staging_id", row.staging_id))
            .await
            .map_err(backend)?;
        Ok(())
    }

    /// Newest ready record for a key
    #[instrument(skip(self), fields(key = %key))]
    pub async fn staging_latest_ready(
        &self,
        key: &StagingKey,
    ) -> StorageResult<Option<StagingRecord>> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM stagings WHERE agent_id = $agent_id AND target = $target \
                 AND status = 'ready' ORDER BY updated_at DESC LIMIT 1",
            )
            .bind(("agent_id", key.agent_id.clone()))
            .bind(("target", key.target.clone()))
            .await
            .map_err(backend)?;

        let rows: Vec<StagingRow> = result.take(0).map_err(backend)?;
        rows.into_iter().next().map(StagingRow::into_record).transpose()
    }

    /// The active record that owns a checkout directory
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub async fn staging_find_active_by_dir(
        &self,
        dir: &Path,
    ) -> StorageResult<Option<StagingRecord>> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM stagings WHERE checkout_dir = $dir \
                 AND status != 'deleted' ORDER BY updated_at DESC LIMIT 1",
            )
            .bind(("dir", dir.to_string_lossy().into_owned()))
            .await
            .map_err(backend)?;

        let rows: Vec<StagingRow> = result.take(0).map_err(backend)?;
        rows.into_iter().next().map(StagingRow::into_record).transpose()
    }

    /// All staging records of an agent, newest first
    #[instrument(skip(self))]
    pub async fn staging_list_for_agent(&self, agent_id: &str) -> StorageResult<Vec<StagingRecord>> {
        let mut result = self
            .db
            .query("SELECT * FROM stagings WHERE agent_id = $agent_id ORDER BY created_at DESC")
            .bind(("agent_id", agent_id.to_string()))
            .await
            .map_err(backend)?;

        let rows: Vec<StagingRow> = result.take(0).map_err(backend)?;
        rows.into_iter().map(StagingRow::into_record).collect()
    }

    /// Flip the active record for a key to `deleted`
    #[instrument(skip(self), fields(key = %key))]
    pub async fn staging_mark_deleted(
        &self,
        key: &StagingKey,
    ) -> StorageResult<Option<StagingRecord>> {
        let Some(mut record) = self.staging_get_active(key).await? else {
            return Ok(None);
        };
        record.status = crate::storage_traits::StagingStatus::Deleted;
        record.staged_path = None;
        record.updated_at = Utc::now();
        self.staging_write(&record).await?;
        info!(staging_id = %record.staging_id, "staging record deleted");
        Ok(Some(record))
    }
}
