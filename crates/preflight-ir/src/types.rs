use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level harness description: what the app asks for, how it asks, and
/// what each screen should show afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessSpec {
    pub name: String,
    pub alerts: Vec<AlertSpec>,
    pub screens: Vec<String>,
    #[serde(default)]
    pub rules: Vec<ScreenRule>,
    pub triggers: Vec<TriggerStep>,
    #[serde(default)]
    pub settings: RunSettings,
}

impl HarnessSpec {
    /// Tracked permission kinds in the fixed kind ordering.
    pub fn kinds(&self) -> Vec<PermissionKind> {
        let mut kinds: Vec<PermissionKind> = self.alerts.iter().map(|a| a.kind).collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    pub fn alert_for(&self, kind: PermissionKind) -> Option<&AlertSpec> {
        self.alerts.iter().find(|a| a.kind == kind)
    }

    /// Rules that apply to `screen`, in declaration order.
    pub fn rules_for<'a>(&'a self, screen: &'a str) -> impl Iterator<Item = &'a ScreenRule> + 'a {
        self.rules.iter().filter(move |r| r.screen == screen)
    }
}

// ── Permissions ──────────────────────────────────────────────────────

/// A capability the app requests through a system prompt.
///
/// Declaration order is the fixed kind ordering; scenario generation and
/// reports rely on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    Contacts,
    Location,
    Camera,
    Photos,
    Microphone,
    Calendars,
    Reminders,
    Notifications,
}

impl PermissionKind {
    pub const ALL: [PermissionKind; 8] = [
        PermissionKind::Contacts,
        PermissionKind::Location,
        PermissionKind::Camera,
        PermissionKind::Photos,
        PermissionKind::Microphone,
        PermissionKind::Calendars,
        PermissionKind::Reminders,
        PermissionKind::Notifications,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionKind::Contacts => "contacts",
            PermissionKind::Location => "location",
            PermissionKind::Camera => "camera",
            PermissionKind::Photos => "photos",
            PermissionKind::Microphone => "microphone",
            PermissionKind::Calendars => "calendars",
            PermissionKind::Reminders => "reminders",
            PermissionKind::Notifications => "notifications",
        }
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a scenario answers one permission prompt. `Grant` sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionDecision {
    Grant,
    Deny,
}

impl PermissionDecision {
    pub const ALL: [PermissionDecision; 2] = [PermissionDecision::Grant, PermissionDecision::Deny];

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionDecision::Grant => "grant",
            PermissionDecision::Deny => "deny",
        }
    }
}

impl fmt::Display for PermissionDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The system alert a permission kind produces, matched by exact text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSpec {
    pub kind: PermissionKind,
    pub alert_text: String,
    /// Button label to press for each decision, e.g. grant -> "OK",
    /// deny -> "Don't Allow".
    pub buttons: BTreeMap<PermissionDecision, String>,
}

impl AlertSpec {
    pub fn new(
        kind: PermissionKind,
        alert_text: impl Into<String>,
        grant_label: impl Into<String>,
        deny_label: impl Into<String>,
    ) -> Self {
        let mut buttons = BTreeMap::new();
        buttons.insert(PermissionDecision::Grant, grant_label.into());
        buttons.insert(PermissionDecision::Deny, deny_label.into());
        Self {
            kind,
            alert_text: alert_text.into(),
            buttons,
        }
    }

    pub fn button_for(&self, decision: PermissionDecision) -> Option<&str> {
        self.buttons.get(&decision).map(|s| s.as_str())
    }

    /// Reverse lookup used by hosts that need to interpret a pressed label.
    pub fn decision_for_button(&self, label: &str) -> Option<PermissionDecision> {
        self.buttons
            .iter()
            .find(|(_, l)| l.as_str() == label)
            .map(|(d, _)| *d)
    }
}

// ── Screens ──────────────────────────────────────────────────────────

/// One row of the screen message table: whether `screen` shows
/// `message_element` when `kind` was denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenRule {
    pub screen: String,
    pub kind: PermissionKind,
    pub message_element: String,
    #[serde(default = "default_shown_when_denied")]
    pub shown_when_denied: bool,
}

fn default_shown_when_denied() -> bool {
    true
}

// ── Triggers ─────────────────────────────────────────────────────────

/// An action that makes the app present its permission prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerStep {
    Launch,
    Tap { element: String },
    Navigate { screen: String },
}

impl fmt::Display for TriggerStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerStep::Launch => write!(f, "launch"),
            TriggerStep::Tap { element } => write!(f, "tap {element}"),
            TriggerStep::Navigate { screen } => write!(f, "navigate {screen}"),
        }
    }
}

// ── Settings ─────────────────────────────────────────────────────────

/// Bounded wait for expected alerts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// How long to wait for every expected alert after the triggers ran.
    pub alert_timeout_ms: u64,
    /// Pause between interruption pumps while waiting.
    pub poll_interval_ms: u64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            alert_timeout_ms: 5_000,
            poll_interval_ms: 100,
        }
    }
}
