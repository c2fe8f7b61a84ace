use preflight_ir::parse::{load_spec, parse_spec, LoadError};
use preflight_ir::types::{PermissionDecision, PermissionKind, RunSettings, TriggerStep};

const FIRST_RUN: &str = include_str!("fixtures/first_run.json");

#[test]
fn test_parse_fixture() {
    let spec = parse_spec(FIRST_RUN).unwrap();
    assert_eq!(spec.name, "atlas-first-run");
    assert_eq!(spec.alerts.len(), 2);
    assert_eq!(spec.screens, vec!["feed", "friends", "nearby"]);
    assert_eq!(spec.rules.len(), 6);
    assert_eq!(
        spec.triggers,
        vec![
            TriggerStep::Launch,
            TriggerStep::Tap {
                element: "onboarding.continue".to_string()
            }
        ]
    );
}

#[test]
fn test_kinds_follow_fixed_order() {
    let spec = parse_spec(FIRST_RUN).unwrap();
    assert_eq!(
        spec.kinds(),
        vec![PermissionKind::Contacts, PermissionKind::Location]
    );
}

#[test]
fn test_button_labels_by_decision() {
    let spec = parse_spec(FIRST_RUN).unwrap();
    let contacts = spec.alert_for(PermissionKind::Contacts).unwrap();
    assert_eq!(contacts.button_for(PermissionDecision::Grant), Some("OK"));
    assert_eq!(
        contacts.button_for(PermissionDecision::Deny),
        Some("Don't Allow")
    );
    assert_eq!(
        contacts.decision_for_button("Don't Allow"),
        Some(PermissionDecision::Deny)
    );
    assert_eq!(contacts.decision_for_button("Maybe"), None);
}

#[test]
fn test_shown_when_denied_defaults_to_true() {
    let spec = parse_spec(FIRST_RUN).unwrap();
    let feed: Vec<_> = spec.rules_for("feed").collect();
    assert_eq!(feed.len(), 2);
    assert!(feed.iter().all(|r| r.shown_when_denied));

    let nearby_contacts = spec
        .rules_for("nearby")
        .find(|r| r.kind == PermissionKind::Contacts)
        .unwrap();
    assert!(!nearby_contacts.shown_when_denied);
}

#[test]
fn test_settings_default_when_omitted() {
    let json = r#"{
        "name": "minimal",
        "alerts": [
            { "kind": "camera", "alert_text": "Camera?", "buttons": { "grant": "OK", "deny": "No" } }
        ],
        "screens": [],
        "triggers": [ { "type": "launch" } ]
    }"#;
    let spec = load_spec(json).unwrap();
    assert_eq!(spec.settings, RunSettings::default());
    assert!(spec.rules.is_empty());
}

#[test]
fn test_parse_rejects_unknown_kind() {
    let json = r#"{
        "name": "bad",
        "alerts": [ { "kind": "bluetooth", "alert_text": "x", "buttons": {} } ],
        "screens": [],
        "triggers": []
    }"#;
    assert!(parse_spec(json).is_err());
}

#[test]
fn test_load_reports_validation_errors() {
    let json = r#"{
        "name": "bad",
        "alerts": [ { "kind": "contacts", "alert_text": "", "buttons": { "grant": "OK" } } ],
        "screens": [],
        "triggers": []
    }"#;
    match load_spec(json) {
        Err(LoadError::Invalid(errors)) => assert_eq!(errors.len(), 3),
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[test]
fn test_load_not_json() {
    assert!(matches!(load_spec("not json"), Err(LoadError::Parse(_))));
}
