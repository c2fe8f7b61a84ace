//! Alert interception registry.
//!
//! Holds one watcher per expected permission alert, keyed by exact alert
//! text, and resolves host dialogs against them. A registry lives for one
//! run only; the runner builds a fresh one per scenario so decisions never
//! leak between scenarios.

use std::fmt;

use preflight_ir::types::{AlertSpec, PermissionDecision, PermissionKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::host::{AlertDialog, DriverError, InterruptionMonitor};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("A watcher for alert text {text:?} is already registered (kind '{existing}')")]
    DuplicateAlertText {
        text: String,
        existing: PermissionKind,
    },

    #[error("Alert for kind '{kind}' has no button label for '{decision}'")]
    MissingButton {
        kind: PermissionKind,
        decision: PermissionDecision,
    },
}

/// Message sent to a watcher's `on_handled` callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertObservation {
    pub kind: PermissionKind,
    pub decision: PermissionDecision,
    pub alert_text: String,
    pub button: String,
}

/// A watcher matched a dialog but pressing its button failed.
#[derive(Debug, Clone, PartialEq)]
pub struct InterceptionFailure {
    pub kind: PermissionKind,
    pub button: String,
    pub error: DriverError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatcherId(usize);

struct Watcher<'a> {
    id: WatcherId,
    kind: PermissionKind,
    alert_text: String,
    decision: PermissionDecision,
    button: String,
    on_handled: Box<dyn FnMut(AlertObservation) + 'a>,
}

impl fmt::Debug for Watcher<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("alert_text", &self.alert_text)
            .field("decision", &self.decision)
            .field("button", &self.button)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct AlertInterceptionRegistry<'a> {
    watchers: Vec<Watcher<'a>>,
    unclaimed: Vec<String>,
    failures: Vec<InterceptionFailure>,
}

impl<'a> AlertInterceptionRegistry<'a> {
    pub fn new() -> Self {
        Self {
            watchers: Vec::new(),
            unclaimed: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Install a watcher for `spec`, answering with `decision`.
    ///
    /// Must happen before any action that can present the alert; the host
    /// only consults watchers that exist when the dialog appears.
    pub fn register<F>(
        &mut self,
        spec: &AlertSpec,
        decision: PermissionDecision,
        on_handled: F,
    ) -> Result<WatcherId, RegistryError>
    where
        F: FnMut(AlertObservation) + 'a,
    {
        if let Some(existing) = self
            .watchers
            .iter()
            .find(|w| w.alert_text == spec.alert_text)
        {
            return Err(RegistryError::DuplicateAlertText {
                text: spec.alert_text.clone(),
                existing: existing.kind,
            });
        }

        let button = spec
            .button_for(decision)
            .ok_or(RegistryError::MissingButton {
                kind: spec.kind,
                decision,
            })?
            .to_string();

        let id = WatcherId(self.watchers.len());
        debug!(kind = %spec.kind, %decision, button = %button, "watcher registered");
        self.watchers.push(Watcher {
            id,
            kind: spec.kind,
            alert_text: spec.alert_text.clone(),
            decision,
            button,
            on_handled: Box::new(on_handled),
        });
        Ok(id)
    }

    /// Alert texts no watcher claimed, in arrival order.
    pub fn unclaimed(&self) -> &[String] {
        &self.unclaimed
    }

    pub fn failures(&self) -> &[InterceptionFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }
}

impl InterruptionMonitor for AlertInterceptionRegistry<'_> {
    fn handle(&mut self, dialog: &mut dyn AlertDialog) -> bool {
        // Most recently registered watcher wins, matching host monitor stacks.
        let Some(watcher) = self
            .watchers
            .iter_mut()
            .rev()
            .find(|w| w.alert_text == dialog.text())
        else {
            warn!(alert_text = %dialog.text(), "no watcher matches alert");
            self.unclaimed.push(dialog.text().to_string());
            return false;
        };

        if let Err(error) = dialog.press(&watcher.button) {
            warn!(
                kind = %watcher.kind,
                button = %watcher.button,
                available = ?dialog.buttons(),
                %error,
                "button press failed"
            );
            self.failures.push(InterceptionFailure {
                kind: watcher.kind,
                button: watcher.button.clone(),
                error,
            });
            return false;
        }

        debug!(kind = %watcher.kind, button = %watcher.button, "alert handled");
        (watcher.on_handled)(AlertObservation {
            kind: watcher.kind,
            decision: watcher.decision,
            alert_text: watcher.alert_text.clone(),
            button: watcher.button.clone(),
        });
        true
    }
}
