//! Run requests and results. Neither is persisted.

use std::path::PathBuf;

use depot_state::{JsonMap, StagingRecord};
use serde::{Deserialize, Serialize};

/// Inputs plus the target whose ready staging should be used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub inputs: JsonMap,
    pub target: String,
}

impl RunRequest {
    pub fn new(target: impl Into<String>, inputs: JsonMap) -> Self {
        Self {
            inputs,
            target: target.into(),
        }
    }
}

/// Outputs of a successful invocation and the staging it ran from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub outputs: JsonMap,
    pub staging_id: String,
    pub target: String,
    pub staged_path: PathBuf,
}

impl RunResult {
    pub fn new(outputs: JsonMap, staging: &StagingRecord, staged_path: PathBuf) -> Self {
        Self {
            outputs,
            staging_id: staging.staging_id.clone(),
            target: staging.target.clone(),
            staged_path,
        }
    }
}
