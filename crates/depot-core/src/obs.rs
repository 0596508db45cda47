//! Structured observability hooks for the staging and invocation lifecycle.
//!
//! This module provides:
//! - An agent-scoped tracing span via `agent_span`
//! - Emission functions for key lifecycle events: staging, invocation, validation
//!
//! Events are emitted at `info!` level (filter with `RUST_LOG`).

use std::path::Path;
use std::time::Instant;

use tracing::info;

/// Span tagging work for one agent/target pair.
///
/// Attach it to futures with `tracing::Instrument` rather than entering
/// it, so the span follows the task across await points.
///
/// # Example
///
/// ```ignore
/// cache.stage(&agent, "dev", &workdir)
///     .instrument(agent_span(&agent.id, "dev"))
///     .await?;
/// ```
pub fn agent_span(agent_id: &str, target: &str) -> tracing::Span {
    tracing::info_span!("depot.agent", agent_id = %agent_id, target = %target)
}

/// Milliseconds since `started`, saturating at `u64::MAX`.
pub fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Emit event: a staging attempt has a destination and is about to fetch.
pub fn emit_staging_requested(agent_id: &str, target: &str, dest: &Path) {
    info!(
        event = "staging.requested",
        agent_id = %agent_id,
        target = %target,
        dest = %dest.display(),
    );
}

/// Emit event: staging attempt finished with the recorded status.
pub fn emit_staging_finished(agent_id: &str, target: &str, status: &str, duration_ms: u64) {
    info!(
        event = "staging.finished",
        agent_id = %agent_id,
        target = %target,
        status = %status,
        duration_ms = duration_ms,
    );
}

/// Emit event: another stage call holds the lease for this pair.
pub fn emit_staging_lease_wait(agent_id: &str, target: &str) {
    info!(event = "staging.lease_wait", agent_id = %agent_id, target = %target);
}

/// Emit event: one invocation finished.
pub fn emit_invocation_finished(entrypoint: &str, duration_ms: u64, success: bool) {
    info!(
        event = "invocation.finished",
        entrypoint = %entrypoint,
        duration_ms = duration_ms,
        success = success,
    );
}

/// Emit event: smoke validation finished.
pub fn emit_validation_finished(agent_id: &str, validated: bool, reason: Option<&str>) {
    info!(
        event = "validation.finished",
        agent_id = %agent_id,
        validated = validated,
        reason = reason.unwrap_or(""),
    );
}
