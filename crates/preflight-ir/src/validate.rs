use std::collections::HashSet;

use crate::types::{HarnessSpec, PermissionDecision, PermissionKind};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("No alerts declared: at least one permission kind must be tracked")]
    NoAlerts,

    #[error("Duplicate alert for kind '{kind}'")]
    DuplicateKind { kind: PermissionKind },

    #[error("Alert text for kind '{kind}' is empty")]
    EmptyAlertText { kind: PermissionKind },

    #[error("Alert text is shared by '{first}' and '{second}': {text:?}")]
    DuplicateAlertText {
        text: String,
        first: PermissionKind,
        second: PermissionKind,
    },

    #[error("Alert for kind '{kind}' has no button label for '{decision}'")]
    MissingButton {
        kind: PermissionKind,
        decision: PermissionDecision,
    },

    #[error("Duplicate screen '{screen}'")]
    DuplicateScreen { screen: String },

    #[error("Rule references unknown screen '{screen}'")]
    UnknownScreen { screen: String },

    #[error("Rule on screen '{screen}' references untracked kind '{kind}'")]
    UntrackedKind { screen: String, kind: PermissionKind },

    #[error("Duplicate rule for screen '{screen}' and kind '{kind}'")]
    DuplicateRule { screen: String, kind: PermissionKind },

    #[error("No trigger steps: nothing would make the app present its prompts")]
    NoTriggers,

    #[error("Poll interval must be greater than zero")]
    ZeroPollInterval,
}

/// One line listing every error, for error messages.
pub fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn validate_spec(spec: &HarnessSpec) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    validate_alerts(spec, &mut errors);
    validate_screens(spec, &mut errors);
    validate_rules(spec, &mut errors);
    if spec.triggers.is_empty() {
        errors.push(ValidationError::NoTriggers);
    }
    if spec.settings.poll_interval_ms == 0 {
        errors.push(ValidationError::ZeroPollInterval);
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// One alert per kind, distinct non-empty texts, a label for every decision.
fn validate_alerts(spec: &HarnessSpec, errors: &mut Vec<ValidationError>) {
    if spec.alerts.is_empty() {
        errors.push(ValidationError::NoAlerts);
        return;
    }

    let mut kinds = HashSet::new();
    for alert in &spec.alerts {
        if !kinds.insert(alert.kind) {
            errors.push(ValidationError::DuplicateKind { kind: alert.kind });
        }
        if alert.alert_text.is_empty() {
            errors.push(ValidationError::EmptyAlertText { kind: alert.kind });
        }
        for decision in PermissionDecision::ALL {
            match alert.button_for(decision) {
                Some(label) if !label.is_empty() => {}
                _ => errors.push(ValidationError::MissingButton {
                    kind: alert.kind,
                    decision,
                }),
            }
        }
    }

    for (i, a) in spec.alerts.iter().enumerate() {
        for b in &spec.alerts[i + 1..] {
            if a.kind != b.kind && !a.alert_text.is_empty() && a.alert_text == b.alert_text {
                errors.push(ValidationError::DuplicateAlertText {
                    text: a.alert_text.clone(),
                    first: a.kind,
                    second: b.kind,
                });
            }
        }
    }
}

fn validate_screens(spec: &HarnessSpec, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for screen in &spec.screens {
        if !seen.insert(screen.as_str()) {
            errors.push(ValidationError::DuplicateScreen {
                screen: screen.clone(),
            });
        }
    }
}

/// Every rule must point at a declared screen and a tracked kind.
fn validate_rules(spec: &HarnessSpec, errors: &mut Vec<ValidationError>) {
    let screens: HashSet<&str> = spec.screens.iter().map(|s| s.as_str()).collect();
    let kinds: HashSet<PermissionKind> = spec.alerts.iter().map(|a| a.kind).collect();
    let mut pairs = HashSet::new();

    for rule in &spec.rules {
        if !screens.contains(rule.screen.as_str()) {
            errors.push(ValidationError::UnknownScreen {
                screen: rule.screen.clone(),
            });
        }
        if !kinds.contains(&rule.kind) {
            errors.push(ValidationError::UntrackedKind {
                screen: rule.screen.clone(),
                kind: rule.kind,
            });
        }
        if !pairs.insert((rule.screen.as_str(), rule.kind)) {
            errors.push(ValidationError::DuplicateRule {
                screen: rule.screen.clone(),
                kind: rule.kind,
            });
        }
    }
}
