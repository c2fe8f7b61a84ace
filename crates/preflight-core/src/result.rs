use std::collections::BTreeSet;
use std::fmt;

use preflight_driver::host::CleanStateAttestation;
use preflight_driver::registry::AlertObservation;
use preflight_ir::types::PermissionKind;
use preflight_matrix::scenario::Scenario;
use preflight_verify::verifier::ScreenMismatch;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => f.write_str("PASS"),
            Verdict::Fail => f.write_str("FAIL"),
        }
    }
}

/// Runner lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    PreconditionAssumed,
    Running,
    AwaitingAlerts,
    Verifying,
    Reported(Verdict),
}

/// Why a run failed, other than a plain message mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunFault {
    #[error("clean permission state unavailable: {reason}")]
    PreconditionUnavailable { reason: String },

    #[error("watcher registration failed: {reason}")]
    RegistrationFailed { reason: String },

    #[error("unhandled interruption {alert_text:?} (unobserved: {})", join_kinds(.unobserved))]
    UnhandledInterruption {
        alert_text: String,
        unobserved: Vec<PermissionKind>,
    },

    #[error("alert timeout after {waited_ms}ms (missing: {}); permission state was probably not clean", join_kinds(.missing))]
    AlertTimeout {
        missing: Vec<PermissionKind>,
        waited_ms: u64,
    },

    #[error("pressing {button:?} on the {kind} alert failed: {reason}")]
    ButtonPressFailed {
        kind: PermissionKind,
        button: String,
        reason: String,
    },

    #[error("driver failure during '{step}': {reason}")]
    DriverFailure { step: String, reason: String },

    #[error("navigation to '{screen}' failed: {reason}")]
    NavigationFailure { screen: String, reason: String },

    #[error("query of '{element}' on '{screen}' failed: {reason}")]
    QueryFailure {
        screen: String,
        element: String,
        reason: String,
    },
}

impl RunFault {
    /// Fatal faults abort the run; the others only cost one screen's checks.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            RunFault::NavigationFailure { .. } | RunFault::QueryFailure { .. }
        )
    }
}

fn join_kinds(kinds: &[PermissionKind]) -> String {
    if kinds.is_empty() {
        return "none".to_string();
    }
    kinds
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Everything one scenario run produced. Owned and mutated by its runner
/// only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub scenario: Scenario,
    pub device: String,
    pub attestation: Option<CleanStateAttestation>,
    pub alerts_observed: BTreeSet<PermissionKind>,
    pub observations: Vec<AlertObservation>,
    pub verification_failures: Vec<ScreenMismatch>,
    pub faults: Vec<RunFault>,
    pub phases: Vec<RunPhase>,
    /// Expectations compared during verification.
    pub checks: usize,
    pub verdict: Option<Verdict>,
}

impl RunResult {
    pub fn new(scenario: Scenario, device: impl Into<String>) -> Self {
        Self {
            scenario,
            device: device.into(),
            attestation: None,
            alerts_observed: BTreeSet::new(),
            observations: Vec::new(),
            verification_failures: Vec::new(),
            faults: Vec::new(),
            phases: vec![RunPhase::Idle],
            checks: 0,
            verdict: None,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phases.last().copied().unwrap_or(RunPhase::Idle)
    }

    pub(crate) fn enter(&mut self, phase: RunPhase) {
        debug!(scenario = self.scenario.index, ?phase, "phase");
        self.phases.push(phase);
    }

    pub(crate) fn observe(&mut self, observation: AlertObservation) {
        self.alerts_observed.insert(observation.kind);
        self.observations.push(observation);
    }

    /// Scenario kinds whose alert has not been observed, in kind order.
    pub fn missing_kinds(&self) -> Vec<PermissionKind> {
        self.scenario
            .kinds()
            .filter(|k| !self.alerts_observed.contains(k))
            .collect()
    }

    /// Every expected alert appeared. A run that fails this says nothing
    /// about the app: the clean-state precondition did not hold.
    pub fn is_valid(&self) -> bool {
        self.missing_kinds().is_empty()
    }

    pub fn passed(&self) -> bool {
        self.verdict == Some(Verdict::Pass)
    }

    pub(crate) fn finalize(&mut self) -> Verdict {
        let verdict = if self.is_valid()
            && self.verification_failures.is_empty()
            && self.faults.is_empty()
        {
            Verdict::Pass
        } else {
            Verdict::Fail
        };
        self.verdict = Some(verdict);
        self.enter(RunPhase::Reported(verdict));
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use preflight_ir::types::PermissionDecision;
    use preflight_matrix::generate::generate;

    fn observation(kind: PermissionKind) -> AlertObservation {
        AlertObservation {
            kind,
            decision: PermissionDecision::Grant,
            alert_text: format!("{kind}?"),
            button: "OK".to_string(),
        }
    }

    #[test]
    fn test_missing_alert_fails_even_without_mismatches() {
        let scenario = generate(&[PermissionKind::Contacts, PermissionKind::Location])
            .remove(0);
        let mut result = RunResult::new(scenario, "sim");
        result.observe(observation(PermissionKind::Contacts));

        assert!(!result.is_valid());
        assert_eq!(result.missing_kinds(), vec![PermissionKind::Location]);
        assert_eq!(result.finalize(), Verdict::Fail);
        assert_eq!(result.phase(), RunPhase::Reported(Verdict::Fail));
    }

    #[test]
    fn test_full_coverage_no_issues_passes() {
        let scenario = generate(&[PermissionKind::Contacts]).remove(1);
        let mut result = RunResult::new(scenario, "sim");
        result.observe(observation(PermissionKind::Contacts));
        assert_eq!(result.finalize(), Verdict::Pass);
        assert!(result.passed());
    }

    #[test]
    fn test_fault_display_lists_kinds() {
        let fault = RunFault::AlertTimeout {
            missing: vec![PermissionKind::Contacts, PermissionKind::Location],
            waited_ms: 50,
        };
        assert!(fault.to_string().contains("missing: contacts, location"));
        assert!(fault.is_fatal());
        assert!(!RunFault::NavigationFailure {
            screen: "feed".to_string(),
            reason: "gone".to_string()
        }
        .is_fatal());
    }
}
