use preflight_ir::parse::parse_spec;
use preflight_ir::types::{AlertSpec, HarnessSpec, PermissionKind, ScreenRule};
use preflight_ir::validate::{validate_spec, ValidationError};

fn fixture() -> HarnessSpec {
    parse_spec(include_str!("fixtures/first_run.json")).unwrap()
}

#[test]
fn test_fixture_is_valid() {
    assert!(validate_spec(&fixture()).is_ok());
}

#[test]
fn test_no_alerts() {
    let mut spec = fixture();
    spec.alerts.clear();
    spec.rules.clear();
    let errors = validate_spec(&spec).unwrap_err();
    assert_eq!(errors, vec![ValidationError::NoAlerts]);
}

#[test]
fn test_duplicate_kind() {
    let mut spec = fixture();
    spec.alerts.push(AlertSpec::new(
        PermissionKind::Contacts,
        "Another contacts prompt",
        "OK",
        "Don't Allow",
    ));
    let errors = validate_spec(&spec).unwrap_err();
    assert!(errors.contains(&ValidationError::DuplicateKind {
        kind: PermissionKind::Contacts
    }));
}

#[test]
fn test_shared_alert_text() {
    let mut spec = fixture();
    spec.alerts[1].alert_text = spec.alerts[0].alert_text.clone();
    let errors = validate_spec(&spec).unwrap_err();
    assert!(matches!(
        errors.as_slice(),
        [ValidationError::DuplicateAlertText {
            first: PermissionKind::Contacts,
            second: PermissionKind::Location,
            ..
        }]
    ));
}

#[test]
fn test_rule_on_unknown_screen_and_untracked_kind() {
    let mut spec = fixture();
    spec.rules.push(ScreenRule {
        screen: "settings".to_string(),
        kind: PermissionKind::Camera,
        message_element: "settings.camera_disabled".to_string(),
        shown_when_denied: true,
    });
    let errors = validate_spec(&spec).unwrap_err();
    assert!(errors.contains(&ValidationError::UnknownScreen {
        screen: "settings".to_string()
    }));
    assert!(errors.contains(&ValidationError::UntrackedKind {
        screen: "settings".to_string(),
        kind: PermissionKind::Camera
    }));
}

#[test]
fn test_duplicate_rule_and_screen() {
    let mut spec = fixture();
    let dup = spec.rules[0].clone();
    spec.rules.push(dup);
    spec.screens.push("feed".to_string());
    let errors = validate_spec(&spec).unwrap_err();
    assert!(errors.contains(&ValidationError::DuplicateRule {
        screen: "feed".to_string(),
        kind: PermissionKind::Contacts
    }));
    assert!(errors.contains(&ValidationError::DuplicateScreen {
        screen: "feed".to_string()
    }));
}

#[test]
fn test_no_triggers_and_zero_poll() {
    let mut spec = fixture();
    spec.triggers.clear();
    spec.settings.poll_interval_ms = 0;
    let errors = validate_spec(&spec).unwrap_err();
    assert_eq!(
        errors,
        vec![ValidationError::NoTriggers, ValidationError::ZeroPollInterval]
    );
}
