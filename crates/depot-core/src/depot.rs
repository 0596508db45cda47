//! Registry layer: the operations an API or CLI calls.
//!
//! `Depot` owns the stores and wires the pipeline together. It raises the
//! orchestration-level errors (`AgentNotFound`, `NoReadyStaging`) and is
//! the only writer of an agent's validation state.

use std::sync::Arc;

use chrono::Utc;
use depot_state::fakes::{MemoryAgentStore, MemoryStagingStore};
use depot_state::{
    AgentFilter, AgentRecord, AgentRegistration, AgentStore, JsonMap, StagingKey, StagingRecord,
    StagingStore, SurrealAgentStore, SurrealHandle, SurrealStagingStore,
};
use tracing::{info, instrument, Instrument};

use crate::config::DepotConfig;
use crate::domain::error::{DepotError, Result};
use crate::domain::run::RunResult;
use crate::domain::validation::ValidationOutcome;
use crate::invoke::{DirectInvoker, Invoker};
use crate::loader::{EntrypointResolver, ModuleLoader};
use crate::obs::agent_span;
use crate::runner::Runner;
use crate::source::{GitSourceResolver, SourceResolver};
use crate::staging::StagingCache;
use crate::validator::Validator;

pub struct Depot {
    config: DepotConfig,
    agents: Arc<dyn AgentStore>,
    stagings: Arc<dyn StagingStore>,
    cache: Arc<StagingCache>,
    runner: Runner,
    validator: Validator,
}

impl Depot {
    /// Wire a depot with the git resolver and the direct invoker.
    pub fn new(
        config: DepotConfig,
        agents: Arc<dyn AgentStore>,
        stagings: Arc<dyn StagingStore>,
        loader: Arc<dyn ModuleLoader>,
    ) -> Self {
        let resolver = Arc::new(GitSourceResolver::skipping_vcs(config.skip_vcs));
        Self::from_parts(config, agents, stagings, resolver, loader, Arc::new(DirectInvoker))
    }

    /// Wire a depot from explicit collaborators.
    pub fn from_parts(
        config: DepotConfig,
        agents: Arc<dyn AgentStore>,
        stagings: Arc<dyn StagingStore>,
        source: Arc<dyn SourceResolver>,
        loader: Arc<dyn ModuleLoader>,
        invoker: Arc<dyn Invoker>,
    ) -> Self {
        let cache = Arc::new(StagingCache::new(source, stagings.clone()));
        let runner = Runner::new(EntrypointResolver::new(loader), invoker)
            .with_timeout(config.invoke_timeout());
        let validator = Validator::new(cache.clone(), runner.clone(), config.workdir.clone());
        Self {
            config,
            agents,
            stagings,
            cache,
            runner,
            validator,
        }
    }

    /// Depot over the in-memory fakes.
    pub fn in_memory(config: DepotConfig, loader: Arc<dyn ModuleLoader>) -> Self {
        Self::new(
            config,
            Arc::new(MemoryAgentStore::new()),
            Arc::new(MemoryStagingStore::new()),
            loader,
        )
    }

    /// Depot persisting to SurrealDB.
    pub fn with_surreal(
        config: DepotConfig,
        handle: Arc<SurrealHandle>,
        loader: Arc<dyn ModuleLoader>,
    ) -> Self {
        Self::new(
            config,
            Arc::new(SurrealAgentStore::new(handle.clone())),
            Arc::new(SurrealStagingStore::new(handle)),
            loader,
        )
    }

    pub fn config(&self) -> &DepotConfig {
        &self.config
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    // ========== Agents ==========

    #[instrument(skip(self, registration), fields(name = %registration.name, version = %registration.version))]
    pub async fn register_agent(&self, registration: AgentRegistration) -> Result<AgentRecord> {
        if registration.name.trim().is_empty() || registration.version.trim().is_empty() {
            return Err(DepotError::Config(
                "agent registration needs a non-empty name and version".to_string(),
            ));
        }
        let record = self.agents.insert(AgentRecord::register(registration)).await?;
        info!(agent_id = %record.id, "agent registered");
        Ok(record)
    }

    pub async fn get_agent(&self, agent_id: &str) -> Result<AgentRecord> {
        self.agents
            .get(agent_id)
            .await?
            .ok_or_else(|| DepotError::AgentNotFound(agent_id.to_string()))
    }

    /// Look an agent up by id, `name@version`, or bare name.
    ///
    /// Name lookups pick the most recently registered match.
    pub async fn find_agent(&self, identifier: &str) -> Result<AgentRecord> {
        let identifier = identifier.trim();
        if let Some(agent) = self.agents.get(identifier).await? {
            return Ok(agent);
        }

        if let Some((name, version)) = identifier.rsplit_once('@') {
            if let Some(agent) = self.agents.find_by_name_version(name, version).await? {
                return Ok(agent);
            }
        }

        let by_name = self
            .agents
            .list(&AgentFilter {
                name: Some(identifier.to_string()),
                ..Default::default()
            })
            .await?;
        by_name
            .into_iter()
            .max_by_key(|a| a.created_at)
            .ok_or_else(|| DepotError::AgentNotFound(identifier.to_string()))
    }

    pub async fn list_agents(&self, filter: &AgentFilter) -> Result<Vec<AgentRecord>> {
        Ok(self.agents.list(filter).await?)
    }

    // ========== Staging ==========

    pub async fn stage_agent(&self, agent_id: &str, target: &str) -> Result<StagingRecord> {
        let agent = self.get_agent(agent_id).await?;
        self.cache
            .stage(&agent, target, &self.config.workdir)
            .instrument(agent_span(&agent.id, target))
            .await
    }

    pub async fn get_latest_ready(
        &self,
        agent_id: &str,
        target: &str,
    ) -> Result<Option<StagingRecord>> {
        self.cache.get_latest_ready(agent_id, target).await
    }

    pub async fn list_stagings(&self, agent_id: &str) -> Result<Vec<StagingRecord>> {
        Ok(self.stagings.list_for_agent(agent_id).await?)
    }

    /// Administrative delete. The checkout on disk is left in place.
    pub async fn unstage(&self, agent_id: &str, target: &str) -> Result<Option<StagingRecord>> {
        let key = StagingKey::new(agent_id, target);
        Ok(self.stagings.mark_deleted(&key).await?)
    }

    // ========== Runs ==========

    /// Run an agent from its latest ready staging on `target`.
    #[instrument(skip(self, inputs))]
    pub async fn run_agent(
        &self,
        agent_id: &str,
        inputs: JsonMap,
        target: &str,
    ) -> Result<RunResult> {
        let agent = self.get_agent(agent_id).await?;
        let staging = self
            .cache
            .get_latest_ready(&agent.id, target)
            .await?
            .ok_or_else(|| DepotError::NoReadyStaging {
                agent_id: agent.id.clone(),
                target: target.to_string(),
                reason: None,
            })?;
        self.run_staged(&agent, inputs, staging).await
    }

    /// Stage to the local target and run immediately.
    #[instrument(skip(self, inputs))]
    pub async fn run_local(&self, identifier: &str, inputs: JsonMap) -> Result<RunResult> {
        let agent = self.find_agent(identifier).await?;
        if agent.entrypoint.is_none() {
            return Err(DepotError::NoEntrypoint(agent.id.clone()));
        }
        let target = self.config.run_local_target.clone();
        let staging = self
            .cache
            .stage(&agent, &target, &self.config.workdir)
            .await?;
        if !staging.is_ready() {
            return Err(DepotError::NoReadyStaging {
                agent_id: agent.id.clone(),
                target,
                reason: staging.last_error.clone(),
            });
        }
        self.run_staged(&agent, inputs, staging).await
    }

    async fn run_staged(
        &self,
        agent: &AgentRecord,
        inputs: JsonMap,
        staging: StagingRecord,
    ) -> Result<RunResult> {
        let staged_path = staging.staged_path.clone().ok_or_else(|| {
            DepotError::NoReadyStaging {
                agent_id: agent.id.clone(),
                target: staging.target.clone(),
                reason: None,
            }
        })?;
        let outputs = self
            .runner
            .run(agent, inputs, &staged_path)
            .instrument(agent_span(&agent.id, &staging.target))
            .await?;
        Ok(RunResult::new(outputs, &staging, staged_path))
    }

    // ========== Validation ==========

    /// Smoke-validate an agent and persist the outcome.
    #[instrument(skip(self))]
    pub async fn validate_agent(
        &self,
        agent_id: &str,
        score: Option<f64>,
    ) -> Result<(ValidationOutcome, AgentRecord)> {
        let agent = self.get_agent(agent_id).await?;
        let outcome = self
            .validator
            .validate(&agent, &self.config.sample_target, score)
            .await?;
        let updated = self
            .agents
            .set_validation(&agent.id, outcome.to_state(Utc::now()))
            .await?;
        Ok((outcome, updated))
    }
}
