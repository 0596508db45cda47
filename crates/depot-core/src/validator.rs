//! Validation Orchestrator: stage to the sample target, then smoke-run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use depot_state::{AgentRecord, StagingStatus};
use tracing::instrument;

use crate::domain::error::Result;
use crate::domain::validation::ValidationOutcome;
use crate::metrics::METRICS;
use crate::obs;
use crate::runner::Runner;
use crate::staging::StagingCache;

#[derive(Clone)]
pub struct Validator {
    cache: Arc<StagingCache>,
    runner: Runner,
    workdir: PathBuf,
}

impl Validator {
    pub fn new(cache: Arc<StagingCache>, runner: Runner, workdir: impl Into<PathBuf>) -> Self {
        Self {
            cache,
            runner,
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Stage `agent` to `sample_target` and, if it declares sample inputs,
    /// invoke it once. Outputs are discarded.
    ///
    /// Staging and invocation failures become a `Failed` outcome; only
    /// storage failures are returned as `Err`. Persisting the outcome is
    /// the caller's job.
    #[instrument(skip(self, agent), fields(agent_id = %agent.id))]
    pub async fn validate(
        &self,
        agent: &AgentRecord,
        sample_target: &str,
        score: Option<f64>,
    ) -> Result<ValidationOutcome> {
        METRICS.inc_validations();

        let record = self.cache.stage(agent, sample_target, &self.workdir).await?;
        let outcome = match (record.status, record.staged_path.as_deref()) {
            (StagingStatus::Ready, Some(staged_path)) => match &agent.sample_inputs {
                Some(inputs) => match self.runner.run(agent, inputs.clone(), staged_path).await {
                    Ok(_outputs) => ValidationOutcome::validated(score),
                    Err(e) => ValidationOutcome::invocation_failed(e),
                },
                None => ValidationOutcome::validated(score),
            },
            _ => ValidationOutcome::staging_failed(
                record
                    .last_error
                    .as_deref()
                    .unwrap_or("staging did not reach ready"),
            ),
        };

        let reason = match &outcome {
            ValidationOutcome::Failed { reason } => Some(reason.as_str()),
            ValidationOutcome::Validated { .. } => None,
        };
        obs::emit_validation_finished(&agent.id, outcome.is_validated(), reason);
        Ok(outcome)
    }
}
