//! Capability interface onto the platform's UI automation facility.
//!
//! The harness never talks to a device directly. Everything it needs from
//! the host (dialog interception, button presses, navigation, element
//! queries, the out-of-band permission reset) goes through these traits.

use preflight_ir::types::TriggerStep;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DriverError {
    #[error("Unhandled interruption: no watcher claimed alert {alert_text:?}")]
    UnhandledInterruption { alert_text: String },

    #[error("Button {label:?} not found on alert {alert_text:?}")]
    ButtonNotFound { alert_text: String, label: String },

    #[error("Screen '{screen}' unreachable: {reason}")]
    ScreenUnreachable { screen: String, reason: String },

    #[error("Element query for '{element}' failed: {reason}")]
    ElementQuery { element: String, reason: String },

    #[error("Trigger '{step}' failed: {reason}")]
    Trigger { step: String, reason: String },

    #[error("Permission state reset unavailable: {reason}")]
    ResetUnavailable { reason: String },
}

/// A system dialog the host is currently blocking on.
pub trait AlertDialog {
    fn text(&self) -> &str;
    fn buttons(&self) -> Vec<String>;
    fn press(&mut self, label: &str) -> Result<(), DriverError>;
}

/// Interruption watcher installed with the host.
///
/// Returns true when the dialog was consumed. Returning false leaves the
/// dialog for another watcher; if nobody claims it the host must fail the
/// blocking call with [`DriverError::UnhandledInterruption`] instead of
/// hanging.
pub trait InterruptionMonitor {
    fn handle(&mut self, dialog: &mut dyn AlertDialog) -> bool;
}

/// Host UI driver primitives.
///
/// Every call that can make a system dialog appear takes the monitor, and
/// the host resolves blocking dialogs through it before the call returns.
pub trait HostDriver {
    /// Identifies the device/app instance in reports.
    fn device(&self) -> &str;

    /// Out-of-band reset to "not determined" for every permission. The
    /// returned attestation is recorded, never verified.
    fn reset_permission_state(&mut self) -> Result<CleanStateAttestation, DriverError>;

    fn perform(
        &mut self,
        step: &TriggerStep,
        monitor: &mut dyn InterruptionMonitor,
    ) -> Result<(), DriverError>;

    /// Cooperative poll: present any dialog that became pending since the
    /// last call. Returns how many were resolved.
    fn pump_interruptions(
        &mut self,
        monitor: &mut dyn InterruptionMonitor,
    ) -> Result<usize, DriverError>;

    fn navigate_to(&mut self, screen: &str) -> Result<(), DriverError>;

    fn is_element_visible(&mut self, element: &str) -> Result<bool, DriverError>;
}

/// How the clean permission state was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetMethod {
    /// Someone reset the device by hand and vouches for it.
    Manual,
    /// A device-management or simulator API reset privacy settings.
    DeviceManagement,
    /// The app was installed on a fresh device instance.
    FreshInstance,
}

/// Caller's statement that permission state was "not determined" before
/// the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanStateAttestation {
    pub device: String,
    pub method: ResetMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl CleanStateAttestation {
    pub fn new(device: impl Into<String>, method: ResetMethod) -> Self {
        Self {
            device: device.into(),
            method,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}
