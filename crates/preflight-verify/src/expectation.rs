use preflight_ir::types::{PermissionDecision, PermissionKind, ScreenRule};
use preflight_matrix::scenario::Scenario;
use serde::{Deserialize, Serialize};

/// What one screen should show for one permission under one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenExpectation {
    pub screen: String,
    pub kind: PermissionKind,
    pub decision: PermissionDecision,
    pub message_element: String,
    pub expected_visible: bool,
}

impl ScreenExpectation {
    pub fn from_rule(rule: &ScreenRule, decision: PermissionDecision) -> Self {
        Self {
            screen: rule.screen.clone(),
            kind: rule.kind,
            decision,
            message_element: rule.message_element.clone(),
            expected_visible: rule.shown_when_denied && decision == PermissionDecision::Deny,
        }
    }
}

/// Derive every expectation for `scenario`, in screen order then rule
/// order. Rules for kinds the scenario does not cover are skipped.
pub fn expectations(
    scenario: &Scenario,
    rules: &[ScreenRule],
    screens: &[String],
) -> Vec<ScreenExpectation> {
    screens
        .iter()
        .flat_map(|screen| rules.iter().filter(move |r| &r.screen == screen))
        .filter_map(|rule| {
            scenario
                .decision(rule.kind)
                .map(|decision| ScreenExpectation::from_rule(rule, decision))
        })
        .collect()
}
