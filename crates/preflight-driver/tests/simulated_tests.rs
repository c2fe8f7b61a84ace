use std::cell::RefCell;
use std::collections::BTreeSet;

use preflight_driver::host::{DriverError, HostDriver, ResetMethod};
use preflight_driver::registry::{AlertInterceptionRegistry, AlertObservation};
use preflight_driver::simulated::{AuthorizationStatus, DeviceEvent, SimulatedDevice};
use preflight_ir::parse::parse_spec;
use preflight_ir::types::{HarnessSpec, PermissionDecision, PermissionKind, TriggerStep};

use PermissionDecision::{Deny, Grant};
use PermissionKind::{Contacts, Location};

fn fixture() -> HarnessSpec {
    parse_spec(include_str!("../../preflight-ir/tests/fixtures/first_run.json")).unwrap()
}

fn install<'a>(
    registry: &mut AlertInterceptionRegistry<'a>,
    spec: &HarnessSpec,
    decisions: &[(PermissionKind, PermissionDecision)],
    log: &'a RefCell<Vec<AlertObservation>>,
) {
    for (kind, decision) in decisions {
        let alert = spec.alert_for(*kind).unwrap();
        registry
            .register(alert, *decision, move |obs| log.borrow_mut().push(obs))
            .unwrap();
    }
}

fn observed(log: &RefCell<Vec<AlertObservation>>) -> BTreeSet<PermissionKind> {
    log.borrow().iter().map(|obs| obs.kind).collect()
}

#[test]
fn test_reset_attests_device_management() {
    let spec = fixture();
    let mut device = SimulatedDevice::from_spec("sim-1", &spec);
    let attestation = device.reset_permission_state().unwrap();
    assert_eq!(attestation.device, "sim-1");
    assert_eq!(attestation.method, ResetMethod::DeviceManagement);
    assert_eq!(device.status(Contacts), Some(AuthorizationStatus::NotDetermined));
    assert_eq!(device.events(), [DeviceEvent::Reset]);
}

#[test]
fn test_launch_resolves_alerts_before_returning() {
    let spec = fixture();
    let log = RefCell::new(Vec::new());
    let mut device = SimulatedDevice::from_spec("sim-1", &spec);
    device.reset_permission_state().unwrap();

    let mut registry = AlertInterceptionRegistry::new();
    install(&mut registry, &spec, &[(Contacts, Deny), (Location, Grant)], &log);

    device.perform(&TriggerStep::Launch, &mut registry).unwrap();

    assert_eq!(observed(&log).len(), 2);
    assert_eq!(
        device.pressed_buttons(),
        vec![
            (Contacts, "Don't Allow".to_string()),
            (Location, "Allow".to_string())
        ]
    );
    assert_eq!(device.status(Contacts), Some(AuthorizationStatus::Denied));
    assert_eq!(device.status(Location), Some(AuthorizationStatus::Authorized));
    assert_eq!(log.borrow().len(), 2);
}

#[test]
fn test_changed_copy_fails_instead_of_hanging() {
    let spec = fixture();
    let mut device = SimulatedDevice::from_spec("sim-1", &spec)
        .with_alert_text(Contacts, "\"Atlas\" wants your address book");
    device.reset_permission_state().unwrap();

    let log = RefCell::new(Vec::new());
    let mut registry = AlertInterceptionRegistry::new();
    install(&mut registry, &spec, &[(Contacts, Deny), (Location, Grant)], &log);

    let err = device.perform(&TriggerStep::Launch, &mut registry).unwrap_err();
    assert_eq!(
        err,
        DriverError::UnhandledInterruption {
            alert_text: "\"Atlas\" wants your address book".to_string()
        }
    );
    assert!(observed(&log).is_empty());
    assert_eq!(registry.unclaimed().len(), 1);
}

#[test]
fn test_stale_permission_never_prompts() {
    let spec = fixture();
    let mut device = SimulatedDevice::from_spec("sim-1", &spec)
        .with_stale_permission(Location, AuthorizationStatus::Authorized);
    device.reset_permission_state().unwrap();

    let log = RefCell::new(Vec::new());
    let mut registry = AlertInterceptionRegistry::new();
    install(&mut registry, &spec, &[(Contacts, Grant), (Location, Grant)], &log);

    device.perform(&TriggerStep::Launch, &mut registry).unwrap();
    assert_eq!(device.pump_interruptions(&mut registry).unwrap(), 0);
    assert!(observed(&log).contains(&Contacts));
    assert!(!observed(&log).contains(&Location));
}

#[test]
fn test_delayed_alert_arrives_on_later_pump() {
    let spec = fixture();
    let mut device = SimulatedDevice::from_spec("sim-1", &spec).with_delayed_alert(Location, 2);
    device.reset_permission_state().unwrap();

    let log = RefCell::new(Vec::new());
    let mut registry = AlertInterceptionRegistry::new();
    install(&mut registry, &spec, &[(Contacts, Grant), (Location, Deny)], &log);

    device.perform(&TriggerStep::Launch, &mut registry).unwrap();
    assert!(!observed(&log).contains(&Location));
    assert_eq!(device.pump_interruptions(&mut registry).unwrap(), 0);
    assert_eq!(device.pump_interruptions(&mut registry).unwrap(), 1);
    assert!(observed(&log).contains(&Location));
}

#[test]
fn test_message_visibility_follows_rules() {
    let spec = fixture();
    let log = RefCell::new(Vec::new());
    let mut device = SimulatedDevice::from_spec("sim-1", &spec);
    device.reset_permission_state().unwrap();
    let mut registry = AlertInterceptionRegistry::new();
    install(&mut registry, &spec, &[(Contacts, Deny), (Location, Deny)], &log);
    device.perform(&TriggerStep::Launch, &mut registry).unwrap();

    device.navigate_to("friends").unwrap();
    assert!(device.is_element_visible("friends.contacts_disabled").unwrap());
    // Rule says friends never shows the location message.
    assert!(!device.is_element_visible("friends.location_disabled").unwrap());
    // Element from another screen is not visible here.
    assert!(!device.is_element_visible("feed.contacts_disabled").unwrap());
}

#[test]
fn test_navigation_faults() {
    let spec = fixture();
    let mut device = SimulatedDevice::from_spec("sim-1", &spec).with_unreachable_screen("nearby");
    device.reset_permission_state().unwrap();

    assert!(matches!(
        device.navigate_to("feed"),
        Err(DriverError::ScreenUnreachable { .. })
    ));
    assert!(matches!(
        device.is_element_visible("feed.contacts_disabled"),
        Err(DriverError::ElementQuery { .. })
    ));
}

#[test]
fn test_tap_before_launch_is_trigger_error() {
    let spec = fixture();
    let mut device = SimulatedDevice::from_spec("sim-1", &spec);
    device.reset_permission_state().unwrap();
    let mut registry = AlertInterceptionRegistry::new();
    let err = device
        .perform(
            &TriggerStep::Tap {
                element: "onboarding.continue".to_string(),
            },
            &mut registry,
        )
        .unwrap_err();
    assert!(matches!(err, DriverError::Trigger { .. }));
}

#[test]
fn test_reset_unavailable() {
    let spec = fixture();
    let mut device = SimulatedDevice::from_spec("sim-1", &spec).with_reset_unavailable();
    assert!(matches!(
        device.reset_permission_state(),
        Err(DriverError::ResetUnavailable { .. })
    ));
}

#[test]
fn test_attestation_serializes() {
    let spec = fixture();
    let mut device = SimulatedDevice::from_spec("sim-1", &spec);
    let attestation = device.reset_permission_state().unwrap();
    let json = serde_json::to_value(&attestation).unwrap();
    assert_eq!(json["method"], "device_management");
    assert_eq!(json["note"], "simulated privacy reset");
}
