//! Staging Cache: one live checkout per `(agent_id, target)`.
//!
//! `stage` is create-or-update by natural key. Every call re-runs the
//! source resolver, so a `ready` record always reflects the latest fetch.
//! Failures are persisted on the record rather than only returned.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use depot_state::{AgentRecord, StagingKey, StagingRecord, StagingStore, StagingUpdate};
use sha2::{Digest, Sha256};
use tracing::{instrument, warn};

use crate::domain::error::{DepotError, Result};
use crate::metrics::METRICS;
use crate::obs;
use crate::source::SourceResolver;

const UNKNOWN_AGENT: &str = "unknown-agent";
const UNKNOWN_TARGET: &str = "unknown-target";

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
///
/// Empty or dot-only results fall back to `fallback` so a segment can
/// never escape its parent directory.
pub fn sanitize_segment(raw: &str, fallback: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        fallback.to_string()
    } else {
        cleaned
    }
}

/// `<name>-<first 8 hex chars of sha256(agent_id)>`
fn disambiguated_segment(name_segment: &str, agent_id: &str) -> String {
    let digest = hex::encode(Sha256::digest(agent_id.as_bytes()));
    format!("{name_segment}-{}", &digest[..8])
}

type Lease = Arc<tokio::sync::Mutex<()>>;

pub struct StagingCache {
    resolver: Arc<dyn SourceResolver>,
    store: Arc<dyn StagingStore>,
    leases: Mutex<HashMap<StagingKey, Lease>>,
    /// Serializes picking a checkout directory and persisting the claim,
    /// across all pairs. Held only for those two store calls.
    claims: tokio::sync::Mutex<()>,
}

impl StagingCache {
    pub fn new(resolver: Arc<dyn SourceResolver>, store: Arc<dyn StagingStore>) -> Self {
        Self {
            resolver,
            store,
            leases: Mutex::new(HashMap::new()),
            claims: tokio::sync::Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn StagingStore> {
        &self.store
    }

    fn lease_for(&self, key: &StagingKey) -> Result<Lease> {
        let mut leases = self
            .leases
            .lock()
            .map_err(|_| DepotError::Internal("staging lease table poisoned".to_string()))?;
        Ok(leases.entry(key.clone()).or_default().clone())
    }

    /// Drop the table entry for `key` when `lease` is the last handle
    /// outside the table. Waiters clone under the same lock, so the count
    /// cannot grow while it is checked.
    fn release_lease(&self, key: &StagingKey, lease: Lease) {
        let Ok(mut leases) = self.leases.lock() else {
            return;
        };
        if Arc::strong_count(&lease) == 2 {
            leases.remove(key);
        }
    }

    #[cfg(test)]
    fn lease_count(&self) -> usize {
        self.leases.lock().map(|l| l.len()).unwrap_or(0)
    }

    /// Checkout directory for the pair: the active record's, or a newly
    /// chosen one persisted as `requested`.
    async fn claim_destination(
        &self,
        key: &StagingKey,
        agent: &AgentRecord,
        target: &str,
        workdir: &Path,
    ) -> Result<PathBuf> {
        if let Some(existing) = self.store.get_active(key).await? {
            return Ok(existing.checkout_dir);
        }
        let _claim = self.claims.lock().await;
        let dest = self.destination_for(agent, target, workdir).await?;
        self.store
            .upsert(StagingUpdate::requested(key.clone(), dest.clone()))
            .await?;
        Ok(dest)
    }

    /// Destination directory for an agent/target pair.
    ///
    /// `workdir/<name>/<target>`, unless that directory already belongs
    /// to an active record of a different agent, in which case the name
    /// segment gets a short hash of the agent id appended.
    pub async fn destination_for(
        &self,
        agent: &AgentRecord,
        target: &str,
        workdir: &Path,
    ) -> Result<PathBuf> {
        let name = sanitize_segment(&agent.name, UNKNOWN_AGENT);
        let target = sanitize_segment(target, UNKNOWN_TARGET);

        let plain = workdir.join(&name).join(&target);
        match self.store.find_active_by_dir(&plain).await? {
            Some(owner) if owner.agent_id != agent.id => {
                let alt = workdir
                    .join(disambiguated_segment(&name, &agent.id))
                    .join(&target);
                warn!(
                    agent_id = %agent.id,
                    owner = %owner.agent_id,
                    dest = %alt.display(),
                    "staging directory taken by another agent, using disambiguated path"
                );
                Ok(alt)
            }
            _ => Ok(plain),
        }
    }

    /// Stage `agent` for `target` under `workdir`.
    ///
    /// Returns the persisted record. A failed checkout is not an `Err`:
    /// the record comes back with status `failed` and `last_error` set.
    /// `Err` is reserved for storage and runtime failures.
    #[instrument(skip(self, agent, workdir), fields(agent_id = %agent.id, agent = %agent.name, target = %target))]
    pub async fn stage(
        &self,
        agent: &AgentRecord,
        target: &str,
        workdir: &Path,
    ) -> Result<StagingRecord> {
        let key = StagingKey::new(agent.id.clone(), target);
        let lease = self.lease_for(&key)?;
        let result = {
            let _guard = match lease.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    obs::emit_staging_lease_wait(&agent.id, target);
                    lease.lock().await
                }
            };
            self.stage_leased(key.clone(), agent, target, workdir).await
        };
        self.release_lease(&key, lease);
        result
    }

    async fn stage_leased(
        &self,
        key: StagingKey,
        agent: &AgentRecord,
        target: &str,
        workdir: &Path,
    ) -> Result<StagingRecord> {
        METRICS.inc_stagings_attempted();
        let started = Instant::now();

        let dest = self.claim_destination(&key, agent, target, workdir).await?;
        obs::emit_staging_requested(&agent.id, target, &dest);

        let outcome = match &agent.code_source {
            None => Err(DepotError::SourceUnavailable(
                "agent does not specify a code source; cannot stage".to_string(),
            )),
            Some(source) => {
                let resolver = self.resolver.clone();
                let repo = source.repo.clone();
                let revision = source.pinned_revision().map(str::to_string);
                let dest = dest.clone();
                tokio::task::spawn_blocking(move || {
                    resolver.ensure_checked_out(&repo, revision.as_deref(), &dest)
                })
                .await
                .map_err(|e| DepotError::Internal(format!("staging task failed: {e}")))?
            }
        };

        let update = match &outcome {
            Ok(staged_path) => StagingUpdate::ready(key, dest, staged_path.clone()),
            Err(e) => {
                METRICS.inc_stagings_failed();
                StagingUpdate::failed(key, dest, e.to_string())
            }
        };
        let record = self.store.upsert(update).await?;

        obs::emit_staging_finished(
            &agent.id,
            target,
            record.status.as_str(),
            obs::elapsed_ms(started),
        );
        Ok(record)
    }

    /// Most recent ready record for the pair, if any.
    pub async fn get_latest_ready(
        &self,
        agent_id: &str,
        target: &str,
    ) -> Result<Option<StagingRecord>> {
        let key = StagingKey::new(agent_id, target);
        Ok(self.store.latest_ready(&key).await?)
    }
}
