//! In-memory host that plays the app under test.
//!
//! Built from a harness description, it behaves like a well-behaved app by
//! default: launching presents one system alert per undetermined permission,
//! and each screen shows its permission-disabled message exactly when the
//! rule table says it should. Fault knobs bend that behavior to exercise
//! every failure path of a run without a real device.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use preflight_ir::types::{
    AlertSpec, HarnessSpec, PermissionDecision, PermissionKind, ScreenRule, TriggerStep,
};
use tracing::debug;

use crate::host::{
    AlertDialog, CleanStateAttestation, DriverError, HostDriver, InterruptionMonitor, ResetMethod,
};

/// System authorization status for one permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    NotDetermined,
    Authorized,
    Denied,
}

/// Something the simulated host did, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Reset,
    Launched,
    AlertShown { kind: PermissionKind, text: String },
    ButtonPressed { kind: PermissionKind, label: String },
    Navigated { screen: String },
    Queried { element: String, visible: bool },
}

#[derive(Debug, Clone)]
struct PendingAlert {
    kind: PermissionKind,
    text: String,
    buttons: Vec<String>,
}

struct SimDialog<'d> {
    alert: &'d PendingAlert,
    pressed: Option<String>,
}

impl AlertDialog for SimDialog<'_> {
    fn text(&self) -> &str {
        &self.alert.text
    }

    fn buttons(&self) -> Vec<String> {
        self.alert.buttons.clone()
    }

    fn press(&mut self, label: &str) -> Result<(), DriverError> {
        if self.alert.buttons.iter().any(|b| b == label) {
            self.pressed = Some(label.to_string());
            Ok(())
        } else {
            Err(DriverError::ButtonNotFound {
                alert_text: self.alert.text.clone(),
                label: label.to_string(),
            })
        }
    }
}

#[derive(Debug)]
pub struct SimulatedDevice {
    name: String,
    alerts: Vec<AlertSpec>,
    screens: Vec<String>,
    rules: Vec<ScreenRule>,
    status: BTreeMap<PermissionKind, AuthorizationStatus>,
    pending: VecDeque<PendingAlert>,
    deferred: Vec<(PermissionKind, u32)>,
    current_screen: Option<String>,
    launched: bool,
    events: Vec<DeviceEvent>,
    // fault knobs
    text_overrides: HashMap<PermissionKind, String>,
    button_overrides: HashMap<PermissionKind, Vec<String>>,
    stale: HashMap<PermissionKind, AuthorizationStatus>,
    delays: HashMap<PermissionKind, u32>,
    unreachable: HashSet<String>,
    forced: HashMap<String, bool>,
    reset_unavailable: bool,
}

impl SimulatedDevice {
    pub fn from_spec(name: impl Into<String>, spec: &HarnessSpec) -> Self {
        let status = spec
            .kinds()
            .into_iter()
            .map(|k| (k, AuthorizationStatus::NotDetermined))
            .collect();
        Self {
            name: name.into(),
            alerts: spec.alerts.clone(),
            screens: spec.screens.clone(),
            rules: spec.rules.clone(),
            status,
            pending: VecDeque::new(),
            deferred: Vec::new(),
            current_screen: None,
            launched: false,
            events: Vec::new(),
            text_overrides: HashMap::new(),
            button_overrides: HashMap::new(),
            stale: HashMap::new(),
            delays: HashMap::new(),
            unreachable: HashSet::new(),
            forced: HashMap::new(),
            reset_unavailable: false,
        }
    }

    /// The app's copy changed: the system shows `text` for `kind`.
    pub fn with_alert_text(mut self, kind: PermissionKind, text: impl Into<String>) -> Self {
        self.text_overrides.insert(kind, text.into());
        self
    }

    /// The system alert for `kind` offers these buttons instead.
    pub fn with_alert_buttons(mut self, kind: PermissionKind, buttons: &[&str]) -> Self {
        self.button_overrides
            .insert(kind, buttons.iter().map(|b| b.to_string()).collect());
        self
    }

    /// The reset does not take for `kind`: it keeps `status`, so the
    /// system never prompts for it.
    pub fn with_stale_permission(mut self, kind: PermissionKind, status: AuthorizationStatus) -> Self {
        self.stale.insert(kind, status);
        self
    }

    /// The alert for `kind` appears only after `pumps` interruption polls.
    pub fn with_delayed_alert(mut self, kind: PermissionKind, pumps: u32) -> Self {
        self.delays.insert(kind, pumps);
        self
    }

    pub fn with_unreachable_screen(mut self, screen: impl Into<String>) -> Self {
        self.unreachable.insert(screen.into());
        self
    }

    /// App bug: `element` reports this visibility whatever the permission.
    pub fn with_forced_visibility(mut self, element: impl Into<String>, visible: bool) -> Self {
        self.forced.insert(element.into(), visible);
        self
    }

    pub fn with_reset_unavailable(mut self) -> Self {
        self.reset_unavailable = true;
        self
    }

    pub fn status(&self, kind: PermissionKind) -> Option<AuthorizationStatus> {
        self.status.get(&kind).copied()
    }

    pub fn events(&self) -> &[DeviceEvent] {
        &self.events
    }

    /// Labels pressed on system alerts, in order.
    pub fn pressed_buttons(&self) -> Vec<(PermissionKind, String)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DeviceEvent::ButtonPressed { kind, label } => Some((*kind, label.clone())),
                _ => None,
            })
            .collect()
    }

    fn launch(&mut self) {
        self.launched = true;
        self.current_screen = self.screens.first().cloned();
        self.events.push(DeviceEvent::Launched);

        let kinds: Vec<PermissionKind> = self.alerts.iter().map(|a| a.kind).collect();
        for kind in kinds {
            if self.status(kind) != Some(AuthorizationStatus::NotDetermined) {
                continue;
            }
            match self.delays.get(&kind) {
                Some(&pumps) if pumps > 0 => self.deferred.push((kind, pumps)),
                _ => self.enqueue(kind),
            }
        }
    }

    fn enqueue(&mut self, kind: PermissionKind) {
        let Some(spec) = self.alerts.iter().find(|a| a.kind == kind) else {
            return;
        };
        let text = self
            .text_overrides
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| spec.alert_text.clone());
        let buttons = self
            .button_overrides
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| spec.buttons.values().cloned().collect());
        self.pending.push_back(PendingAlert {
            kind,
            text,
            buttons,
        });
    }

    /// Present pending alerts to the monitor until none remain or one is
    /// left unclaimed.
    fn present(&mut self, monitor: &mut dyn InterruptionMonitor) -> Result<usize, DriverError> {
        let mut resolved = 0;
        while let Some(alert) = self.pending.front().cloned() {
            self.events.push(DeviceEvent::AlertShown {
                kind: alert.kind,
                text: alert.text.clone(),
            });

            let mut dialog = SimDialog {
                alert: &alert,
                pressed: None,
            };
            let handled = monitor.handle(&mut dialog);

            let pressed = match (handled, dialog.pressed) {
                (true, Some(label)) => label,
                _ => {
                    return Err(DriverError::UnhandledInterruption {
                        alert_text: alert.text,
                    })
                }
            };

            self.pending.pop_front();
            let decision = self
                .alerts
                .iter()
                .find(|a| a.kind == alert.kind)
                .and_then(|a| a.decision_for_button(&pressed));
            let status = match decision {
                Some(PermissionDecision::Grant) => AuthorizationStatus::Authorized,
                _ => AuthorizationStatus::Denied,
            };
            debug!(device = %self.name, kind = %alert.kind, label = %pressed, "simulated alert dismissed");
            self.status.insert(alert.kind, status);
            self.events.push(DeviceEvent::ButtonPressed {
                kind: alert.kind,
                label: pressed,
            });
            resolved += 1;
        }
        Ok(resolved)
    }

    fn blocked_by_alert(&self) -> Option<DriverError> {
        self.pending
            .front()
            .map(|a| DriverError::UnhandledInterruption {
                alert_text: a.text.clone(),
            })
    }
}

impl HostDriver for SimulatedDevice {
    fn device(&self) -> &str {
        &self.name
    }

    fn reset_permission_state(&mut self) -> Result<CleanStateAttestation, DriverError> {
        if self.reset_unavailable {
            return Err(DriverError::ResetUnavailable {
                reason: format!("device '{}' has no privacy reset", self.name),
            });
        }
        for (kind, status) in self.status.iter_mut() {
            *status = self
                .stale
                .get(kind)
                .copied()
                .unwrap_or(AuthorizationStatus::NotDetermined);
        }
        self.pending.clear();
        self.deferred.clear();
        self.current_screen = None;
        self.launched = false;
        self.events.clear();
        self.events.push(DeviceEvent::Reset);
        Ok(
            CleanStateAttestation::new(self.name.clone(), ResetMethod::DeviceManagement)
                .with_note("simulated privacy reset"),
        )
    }

    fn perform(
        &mut self,
        step: &TriggerStep,
        monitor: &mut dyn InterruptionMonitor,
    ) -> Result<(), DriverError> {
        match step {
            TriggerStep::Launch => self.launch(),
            TriggerStep::Tap { element } => {
                if !self.launched {
                    return Err(DriverError::Trigger {
                        step: step.to_string(),
                        reason: format!("cannot tap '{element}' before launch"),
                    });
                }
            }
            TriggerStep::Navigate { screen } => {
                self.present(monitor)?;
                self.navigate_to(screen)
                    .map_err(|e| DriverError::Trigger {
                        step: step.to_string(),
                        reason: e.to_string(),
                    })?;
            }
        }
        self.present(monitor)?;
        Ok(())
    }

    fn pump_interruptions(
        &mut self,
        monitor: &mut dyn InterruptionMonitor,
    ) -> Result<usize, DriverError> {
        let mut due = Vec::new();
        self.deferred.retain_mut(|(kind, remaining)| {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                due.push(*kind);
                false
            } else {
                true
            }
        });
        for kind in due {
            self.enqueue(kind);
        }
        self.present(monitor)
    }

    fn navigate_to(&mut self, screen: &str) -> Result<(), DriverError> {
        if let Some(err) = self.blocked_by_alert() {
            return Err(err);
        }
        if !self.launched {
            return Err(DriverError::ScreenUnreachable {
                screen: screen.to_string(),
                reason: "app not launched".to_string(),
            });
        }
        if self.unreachable.contains(screen) || !self.screens.iter().any(|s| s == screen) {
            return Err(DriverError::ScreenUnreachable {
                screen: screen.to_string(),
                reason: "no route to screen".to_string(),
            });
        }
        self.current_screen = Some(screen.to_string());
        self.events.push(DeviceEvent::Navigated {
            screen: screen.to_string(),
        });
        Ok(())
    }

    fn is_element_visible(&mut self, element: &str) -> Result<bool, DriverError> {
        let Some(screen) = self.current_screen.clone() else {
            return Err(DriverError::ElementQuery {
                element: element.to_string(),
                reason: "no screen is showing".to_string(),
            });
        };

        let visible = match self.forced.get(element) {
            Some(&forced) => forced,
            None => self
                .rules
                .iter()
                .find(|r| r.screen == screen && r.message_element == element)
                .map(|r| {
                    r.shown_when_denied
                        && self.status(r.kind) == Some(AuthorizationStatus::Denied)
                })
                .unwrap_or(false),
        };

        self.events.push(DeviceEvent::Queried {
            element: element.to_string(),
            visible,
        });
        Ok(visible)
    }
}
