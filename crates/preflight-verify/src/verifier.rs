//! Screen verifier.
//!
//! Walks the screens of a finished scenario and compares each
//! permission-disabled message against its expectation. Issues come out
//! lazily, one at a time; every screen is visited regardless of what the
//! earlier ones reported.

use std::collections::VecDeque;
use std::fmt;
use std::iter::FusedIterator;

use preflight_driver::host::HostDriver;
use preflight_ir::types::{PermissionDecision, PermissionKind, ScreenRule};
use preflight_matrix::scenario::Scenario;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::expectation::{expectations, ScreenExpectation};

/// A message whose visibility did not match the rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenMismatch {
    pub screen: String,
    pub kind: PermissionKind,
    pub decision: PermissionDecision,
    pub element: String,
    pub expected: bool,
    pub actual: bool,
}

impl fmt::Display for ScreenMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({}={}) expected {} but was {}",
            self.screen,
            self.element,
            self.kind,
            self.decision,
            visibility(self.expected),
            visibility(self.actual),
        )
    }
}

fn visibility(visible: bool) -> &'static str {
    if visible {
        "visible"
    } else {
        "hidden"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VerificationIssue {
    Mismatch(ScreenMismatch),
    /// Screen could not be reached; its expectations were not checked.
    NavigationFailure { screen: String, reason: String },
    QueryFailure {
        screen: String,
        element: String,
        reason: String,
    },
}

impl fmt::Display for VerificationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationIssue::Mismatch(m) => write!(f, "mismatch: {m}"),
            VerificationIssue::NavigationFailure { screen, reason } => {
                write!(f, "navigation to '{screen}' failed: {reason}")
            }
            VerificationIssue::QueryFailure {
                screen,
                element,
                reason,
            } => write!(f, "query of '{element}' on '{screen}' failed: {reason}"),
        }
    }
}

/// Lazy, single-pass verification of one scenario.
pub struct Verification<'d, D: HostDriver + ?Sized> {
    driver: &'d mut D,
    pending: VecDeque<(String, VecDeque<ScreenExpectation>)>,
    current: Option<VecDeque<ScreenExpectation>>,
    checked: usize,
}

/// Start verifying `scenario` across `screens`.
///
/// Screens without any rule for the scenario's kinds are not visited.
pub fn verify<'d, D: HostDriver + ?Sized>(
    driver: &'d mut D,
    scenario: &Scenario,
    rules: &[ScreenRule],
    screens: &[String],
) -> Verification<'d, D> {
    let mut pending: VecDeque<(String, VecDeque<ScreenExpectation>)> = VecDeque::new();
    for expectation in expectations(scenario, rules, screens) {
        match pending.back_mut() {
            Some((screen, group)) if *screen == expectation.screen => group.push_back(expectation),
            _ => pending.push_back((expectation.screen.clone(), VecDeque::from([expectation]))),
        }
    }

    Verification {
        driver,
        pending,
        current: None,
        checked: 0,
    }
}

impl<D: HostDriver + ?Sized> Verification<'_, D> {
    /// Expectations actually compared so far.
    pub fn checked(&self) -> usize {
        self.checked
    }

    /// Screens not yet visited.
    pub fn remaining_screens(&self) -> usize {
        self.pending.len()
    }
}

impl<D: HostDriver + ?Sized> Iterator for Verification<'_, D> {
    type Item = VerificationIssue;

    fn next(&mut self) -> Option<VerificationIssue> {
        loop {
            if self.current.is_none() {
                let (screen, group) = self.pending.pop_front()?;
                if let Err(e) = self.driver.navigate_to(&screen) {
                    warn!(%screen, error = %e, "screen unreachable");
                    return Some(VerificationIssue::NavigationFailure {
                        screen,
                        reason: e.to_string(),
                    });
                }
                debug!(%screen, checks = group.len(), "verifying screen");
                self.current = Some(group);
            }

            let group = self.current.as_mut()?;
            let Some(expectation) = group.pop_front() else {
                self.current = None;
                continue;
            };

            match self.driver.is_element_visible(&expectation.message_element) {
                Ok(actual) => {
                    self.checked += 1;
                    if actual != expectation.expected_visible {
                        return Some(VerificationIssue::Mismatch(ScreenMismatch {
                            screen: expectation.screen,
                            kind: expectation.kind,
                            decision: expectation.decision,
                            element: expectation.message_element,
                            expected: expectation.expected_visible,
                            actual,
                        }));
                    }
                }
                Err(e) => {
                    return Some(VerificationIssue::QueryFailure {
                        screen: expectation.screen,
                        element: expectation.message_element,
                        reason: e.to_string(),
                    })
                }
            }
        }
    }
}

impl<D: HostDriver + ?Sized> FusedIterator for Verification<'_, D> {}
