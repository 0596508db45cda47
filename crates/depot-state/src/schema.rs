//! Row layouts for the Agent Depot SurrealDB tables
//!
//! Tables:
//! - agents: Registered agent metadata and validation state
//! - stagings: One row per staging record, keyed by (agent_id, target)
//!
//! Public records live in `storage_traits`; the row types here are the
//! flattened shapes actually written to the database.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage_traits::{
    AgentRecord, CodeSource, JsonMap, StagingRecord, StagingStatus, ValidationState,
    ValidationStatus,
};

/// Module for serializing chrono DateTime to SurrealDB datetime format
pub(crate) mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Module for serializing optional chrono DateTime to SurrealDB datetime format
pub(crate) mod surreal_datetime_opt {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => {
                let sd = SurrealDatetime::from(*d);
                serde::Serialize::serialize(&Some(sd), serializer)
            }
            None => serde::Serialize::serialize(&None::<SurrealDatetime>, serializer),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = Option::<SurrealDatetime>::deserialize(deserializer)?;
        Ok(sd.map(DateTime::from))
    }
}

/// `agents` table row.
///
/// JSON-valued fields are stored as text so arbitrary schemas round-trip
/// without SurrealDB coercing numbers or empty objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AgentRow {
    pub agent_id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub agent_type: String,
    pub tags: Vec<String>,
    pub inputs_schema: String,
    pub outputs_schema: String,
    pub code_repo: Option<String>,
    pub code_revision: Option<String>,
    pub container_image: Option<String>,
    pub entrypoint: Option<String>,
    pub sample_inputs: Option<String>,
    pub validation_status: String,
    pub validation_score: Option<f64>,
    #[serde(default, with = "surreal_datetime_opt")]
    pub last_validated_at: Option<DateTime<Utc>>,
    pub validation_reason: Option<String>,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "surreal_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl AgentRow {
    pub fn from_record(record: &AgentRecord) -> Result<Self, StorageError> {
        let sample_inputs = match &record.sample_inputs {
            Some(map) => Some(serde_json::to_string(map)?),
            None => None,
        };
        Ok(Self {
            agent_id: record.id.clone(),
            name: record.name.clone(),
            version: record.version.clone(),
            description: record.description.clone(),
            agent_type: record.agent_type.clone(),
            tags: record.tags.clone(),
            inputs_schema: serde_json::to_string(&record.inputs_schema)?,
            outputs_schema: serde_json::to_string(&record.outputs_schema)?,
            code_repo: record.code_source.as_ref().map(|s| s.repo.clone()),
            code_revision: record.code_source.as_ref().and_then(|s| s.revision.clone()),
            container_image: record.container_image.clone(),
            entrypoint: record.entrypoint.clone(),
            sample_inputs,
            validation_status: record.validation.status.as_str().to_string(),
            validation_score: record.validation.score,
            last_validated_at: record.validation.last_validated_at,
            validation_reason: record.validation.reason.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    pub fn into_record(self) -> Result<AgentRecord, StorageError> {
        let status = ValidationStatus::parse(&self.validation_status).ok_or_else(|| {
            StorageError::Serialization(format!(
                "unknown validation status '{}'",
                self.validation_status
            ))
        })?;
        let sample_inputs: Option<JsonMap> = match self.sample_inputs {
            Some(text) => Some(serde_json::from_str(&text)?),
            None => None,
        };
        Ok(AgentRecord {
            id: self.agent_id,
            name: self.name,
            version: self.version,
            description: self.description,
            agent_type: self.agent_type,
            tags: self.tags,
            inputs_schema: serde_json::from_str(&self.inputs_schema)?,
            outputs_schema: serde_json::from_str(&self.outputs_schema)?,
            code_source: self
                .code_repo
                .map(|repo| CodeSource::new(repo, self.code_revision)),
            container_image: self.container_image,
            entrypoint: self.entrypoint,
            sample_inputs,
            validation: ValidationState {
                status,
                score: self.validation_score,
                last_validated_at: self.last_validated_at,
                reason: self.validation_reason,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// `stagings` table row. Paths are stored as UTF-8 strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StagingRow {
    pub staging_id: String,
    pub agent_id: String,
    pub target: String,
    pub status: String,
    pub checkout_dir: String,
    pub staged_path: Option<String>,
    pub last_error: Option<String>,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "surreal_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl StagingRow {
    pub fn from_record(record: &StagingRecord) -> Self {
        Self {
            staging_id: record.staging_id.clone(),
            agent_id: record.agent_id.clone(),
            target: record.target.clone(),
            status: record.status.as_str().to_string(),
            checkout_dir: record.checkout_dir.to_string_lossy().into_owned(),
            staged_path: record
                .staged_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            last_error: record.last_error.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    pub fn into_record(self) -> Result<StagingRecord, StorageError> {
        let status = StagingStatus::parse(&self.status).ok_or_else(|| {
            StorageError::Serialization(format!("unknown staging status '{}'", self.status))
        })?;
        Ok(StagingRecord {
            staging_id: self.staging_id,
            agent_id: self.agent_id,
            target: self.target,
            status,
            checkout_dir: PathBuf::from(self.checkout_dir),
            staged_path: self.staged_path.map(PathBuf::from),
            last_error: self.last_error,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
