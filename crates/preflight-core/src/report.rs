//! Sweep reporting.
//!
//! Lists every scenario by index and name with its verdict and, for
//! failures, the exact faults and mismatches. Rendered as plain text for
//! people and JSON for CI.

use std::fmt::Write as _;

use preflight_ir::types::PermissionKind;
use preflight_verify::verifier::ScreenMismatch;
use serde::{Deserialize, Serialize};

use crate::result::{RunFault, RunResult, Verdict};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub index: usize,
    pub name: String,
    pub device: String,
    pub verdict: Verdict,
    pub alerts_observed: Vec<PermissionKind>,
    pub checks: usize,
    pub faults: Vec<RunFault>,
    pub mismatches: Vec<ScreenMismatch>,
}

impl ScenarioReport {
    pub fn from_result(result: &RunResult) -> Self {
        Self {
            index: result.scenario.index,
            name: result.scenario.name(),
            device: result.device.clone(),
            verdict: result.verdict.unwrap_or(Verdict::Fail),
            alerts_observed: result.alerts_observed.iter().copied().collect(),
            checks: result.checks,
            faults: result.faults.clone(),
            mismatches: result.verification_failures.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub harness: String,
    pub scenarios: Vec<ScenarioReport>,
}

impl SweepReport {
    pub fn new(harness: impl Into<String>, results: &[RunResult]) -> Self {
        let mut scenarios: Vec<ScenarioReport> =
            results.iter().map(ScenarioReport::from_result).collect();
        scenarios.sort_by_key(|s| s.index);
        Self {
            harness: harness.into(),
            scenarios,
        }
    }

    pub fn total(&self) -> usize {
        self.scenarios.len()
    }

    pub fn passed(&self) -> usize {
        self.scenarios
            .iter()
            .filter(|s| s.verdict == Verdict::Pass)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    /// Screen expectations compared across the whole sweep.
    pub fn check_count(&self) -> usize {
        self.scenarios.iter().map(|s| s.checks).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ScenarioReport> {
        self.scenarios.iter().filter(|s| s.verdict == Verdict::Fail)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{}: {}/{} scenarios passed, {} checks",
            self.harness,
            self.passed(),
            self.total(),
            self.check_count()
        );
        for s in &self.scenarios {
            let _ = writeln!(out, "  #{} {} [{}] {}", s.index, s.name, s.device, s.verdict);
            for fault in &s.faults {
                let _ = writeln!(out, "      fault: {fault}");
            }
            for m in &s.mismatches {
                let _ = writeln!(out, "      mismatch: {m}");
            }
        }
        out
    }
}
