//! Runner: resolve an agent's entrypoint in its staged tree and invoke it.
//!
//! Agent code runs on the blocking pool. With a deadline configured, an
//! overrun returns `AgentExecutionError("timeout after N ms")` while the
//! blocking thread is left to finish on its own.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use depot_state::{AgentRecord, JsonMap};
use tracing::instrument;

use crate::domain::error::{DepotError, Result};
use crate::invoke::Invoker;
use crate::loader::EntrypointResolver;
use crate::metrics::METRICS;
use crate::obs;

#[derive(Clone)]
pub struct Runner {
    resolver: EntrypointResolver,
    invoker: Arc<dyn Invoker>,
    timeout: Option<Duration>,
}

impl Runner {
    pub fn new(resolver: EntrypointResolver, invoker: Arc<dyn Invoker>) -> Self {
        Self {
            resolver,
            invoker,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve and invoke synchronously on the current thread.
    pub fn run_blocking(
        &self,
        agent: &AgentRecord,
        inputs: &JsonMap,
        staged_path: &Path,
    ) -> Result<JsonMap> {
        let entrypoint = agent
            .entrypoint
            .as_deref()
            .ok_or_else(|| DepotError::NoEntrypoint(agent.id.clone()))?;
        let unit = self.resolver.resolve(staged_path, entrypoint)?;
        self.invoker.invoke(&unit, entrypoint, inputs)
    }

    /// Run `agent` with `inputs` from `staged_path`.
    #[instrument(skip(self, agent, inputs), fields(agent_id = %agent.id, staged_path = %staged_path.display()))]
    pub async fn run(
        &self,
        agent: &AgentRecord,
        inputs: JsonMap,
        staged_path: &Path,
    ) -> Result<JsonMap> {
        let entrypoint = agent
            .entrypoint
            .clone()
            .ok_or_else(|| DepotError::NoEntrypoint(agent.id.clone()))?;

        METRICS.inc_invocations();
        let started = Instant::now();

        let runner = self.clone();
        let agent_owned = agent.clone();
        let path = staged_path.to_path_buf();
        let task = tokio::task::spawn_blocking(move || {
            runner.run_blocking(&agent_owned, &inputs, &path)
        });

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_elapsed) => {
                    METRICS.inc_invocation_failures();
                    obs::emit_invocation_finished(
                        &entrypoint,
                        obs::elapsed_ms(started),
                        false,
                    );
                    return Err(DepotError::AgentExecution(format!(
                        "timeout after {} ms",
                        limit.as_millis()
                    )));
                }
            },
            None => task.await,
        };

        let result = joined
            .map_err(|e| DepotError::AgentExecution(format!("invocation task failed: {e}")))
            .and_then(|r| r);

        if result.is_err() {
            METRICS.inc_invocation_failures();
        }
        obs::emit_invocation_finished(
            &entrypoint,
            obs::elapsed_ms(started),
            result.is_ok(),
        );
        result
    }
}
