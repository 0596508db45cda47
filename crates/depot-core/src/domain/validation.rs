//! Outcome of a smoke validation.

use chrono::{DateTime, Utc};
use depot_state::ValidationState;
use serde::{Deserialize, Serialize};

/// Result of staging an agent to the sample target and, when it declares
/// sample inputs, invoking it once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ValidationOutcome {
    Validated { score: Option<f64> },
    Failed { reason: String },
}

impl ValidationOutcome {
    pub fn validated(score: Option<f64>) -> Self {
        ValidationOutcome::Validated { score }
    }

    /// Failure during staging; the reason is prefixed `staging: `.
    pub fn staging_failed(error: impl std::fmt::Display) -> Self {
        ValidationOutcome::Failed {
            reason: format!("staging: {error}"),
        }
    }

    /// Failure during resolve or invoke; the reason is prefixed `invocation: `.
    pub fn invocation_failed(error: impl std::fmt::Display) -> Self {
        ValidationOutcome::Failed {
            reason: format!("invocation: {error}"),
        }
    }

    pub fn is_validated(&self) -> bool {
        matches!(self, ValidationOutcome::Validated { .. })
    }

    /// The persisted form of this outcome.
    pub fn to_state(&self, at: DateTime<Utc>) -> ValidationState {
        match self {
            ValidationOutcome::Validated { score } => ValidationState::validated(*score, at),
            ValidationOutcome::Failed { reason } => ValidationState::failed(reason.clone(), at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_state::ValidationStatus;

    #[test]
    fn failure_reasons_are_prefixed() {
        match ValidationOutcome::staging_failed("fetch failed: x") {
            ValidationOutcome::Failed { reason } => assert_eq!(reason, "staging: fetch failed: x"),
            other => panic!("unexpected {other:?}"),
        }
        match ValidationOutcome::invocation_failed("boom") {
            ValidationOutcome::Failed { reason } => assert!(reason.starts_with("invocation: ")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn to_state_carries_score_and_timestamp() {
        let now = Utc::now();
        let state = ValidationOutcome::validated(Some(0.75)).to_state(now);
        assert_eq!(state.status, ValidationStatus::Validated);
        assert_eq!(state.score, Some(0.75));
        assert_eq!(state.last_validated_at, Some(now));

        let failed = ValidationOutcome::staging_failed("nope").to_state(now);
        assert_eq!(failed.status, ValidationStatus::Failed);
        assert_eq!(failed.reason.as_deref(), Some("staging: nope"));
    }
}
