//! Scenario runner.
//!
//! Drives one scenario from clean state to verdict:
//!
//! Idle → PreconditionAssumed → Running → AwaitingAlerts → Verifying → Reported
//!
//! Any fatal fault jumps straight to Reported(fail). A driver panic is caught
//! and recorded as a driver failure of that scenario alone.
//!
//! A run is never retried: a second attempt would need a fresh clean-state
//! precondition, which only the caller can provide.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver};
use preflight_driver::host::{DriverError, HostDriver};
use preflight_driver::registry::{AlertInterceptionRegistry, AlertObservation};
use preflight_ir::types::{HarnessSpec, TriggerStep};
use preflight_matrix::scenario::Scenario;
use preflight_verify::verifier::{verify, VerificationIssue};
use tracing::{debug, info, warn};

use crate::result::{RunFault, RunPhase, RunResult};

/// Runs scenarios of one harness description. Holds no per-run state, so
/// one runner can be shared by every device worker.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioRunner<'s> {
    spec: &'s HarnessSpec,
}

impl<'s> ScenarioRunner<'s> {
    pub fn new(spec: &'s HarnessSpec) -> Self {
        Self { spec }
    }

    pub fn run<D: HostDriver + ?Sized>(&self, driver: &mut D, scenario: &Scenario) -> RunResult {
        let mut result = RunResult::new(scenario.clone(), driver.device());
        info!(scenario = %scenario, device = %driver.device(), "scenario started");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.drive(driver, scenario, &mut result)
        }))
        .unwrap_or_else(|payload| {
            Err(RunFault::DriverFailure {
                step: "host driver".to_string(),
                reason: format!("panicked: {}", panic_message(payload.as_ref())),
            })
        });
        if let Err(fault) = outcome {
            warn!(scenario = %scenario, %fault, "scenario aborted");
            result.faults.push(fault);
        }

        let verdict = result.finalize();
        info!(
            scenario = %scenario,
            %verdict,
            mismatches = result.verification_failures.len(),
            faults = result.faults.len(),
            "scenario reported"
        );
        result
    }

    fn drive<D: HostDriver + ?Sized>(
        &self,
        driver: &mut D,
        scenario: &Scenario,
        result: &mut RunResult,
    ) -> Result<(), RunFault> {
        let attestation = driver
            .reset_permission_state()
            .map_err(|e| RunFault::PreconditionUnavailable {
                reason: e.to_string(),
            })?;
        debug!(method = ?attestation.method, "clean state attested");
        result.attestation = Some(attestation);
        result.enter(RunPhase::PreconditionAssumed);

        // Watchers go in before anything can present a prompt.
        let (tx, rx) = channel::unbounded::<AlertObservation>();
        let mut registry = AlertInterceptionRegistry::new();
        for (kind, decision) in scenario.decisions() {
            let alert = self
                .spec
                .alert_for(kind)
                .ok_or_else(|| RunFault::RegistrationFailed {
                    reason: format!("no alert declared for kind '{kind}'"),
                })?;
            let tx = tx.clone();
            registry
                .register(alert, decision, move |obs| {
                    let _ = tx.send(obs);
                })
                .map_err(|e| RunFault::RegistrationFailed {
                    reason: e.to_string(),
                })?;
        }
        drop(tx);
        result.enter(RunPhase::Running);

        for step in &self.spec.triggers {
            debug!(%step, "trigger");
            let outcome = driver.perform(step, &mut registry);
            drain(&rx, result);
            if let Err(e) = outcome {
                return Err(step_fault(step, e, &registry, result));
            }
            if let Some(fault) = interception_fault(&registry, result) {
                return Err(fault);
            }
        }

        result.enter(RunPhase::AwaitingAlerts);
        self.await_alerts(driver, &mut registry, &rx, result)?;
        drop(registry);

        result.enter(RunPhase::Verifying);
        let mut verification = verify(driver, scenario, &self.spec.rules, &self.spec.screens);
        for issue in verification.by_ref() {
            match issue {
                VerificationIssue::Mismatch(m) => {
                    warn!(mismatch = %m, "verification mismatch");
                    result.verification_failures.push(m);
                }
                VerificationIssue::NavigationFailure { screen, reason } => {
                    result
                        .faults
                        .push(RunFault::NavigationFailure { screen, reason });
                }
                VerificationIssue::QueryFailure {
                    screen,
                    element,
                    reason,
                } => {
                    result.faults.push(RunFault::QueryFailure {
                        screen,
                        element,
                        reason,
                    });
                }
            }
        }
        result.checks = verification.checked();
        Ok(())
    }

    /// Pump host interruptions until every expected alert was observed or
    /// the bounded wait runs out. Always pumps at least once when anything
    /// is still missing.
    fn await_alerts<D: HostDriver + ?Sized>(
        &self,
        driver: &mut D,
        registry: &mut AlertInterceptionRegistry<'_>,
        rx: &Receiver<AlertObservation>,
        result: &mut RunResult,
    ) -> Result<(), RunFault> {
        let timeout = Duration::from_millis(self.spec.settings.alert_timeout_ms);
        let poll = Duration::from_millis(self.spec.settings.poll_interval_ms);
        let started = Instant::now();

        while !result.is_valid() {
            let pumped = driver.pump_interruptions(registry);
            drain(rx, result);
            if let Err(e) = pumped {
                return Err(interception_fault(registry, result)
                    .unwrap_or_else(|| driver_fault("interruption poll", e, result)));
            }
            if let Some(fault) = interception_fault(registry, result) {
                return Err(fault);
            }
            if result.is_valid() {
                break;
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return Err(RunFault::AlertTimeout {
                    missing: result.missing_kinds(),
                    waited_ms: elapsed.as_millis() as u64,
                });
            }
            thread::sleep(poll.min(timeout - elapsed));
        }
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}

fn drain(rx: &Receiver<AlertObservation>, result: &mut RunResult) {
    for observation in rx.try_iter() {
        result.observe(observation);
    }
}

/// Registry-side problems: a failed button press wins over an unclaimed
/// dialog, since the press failure is what left the dialog unclaimed.
fn interception_fault(
    registry: &AlertInterceptionRegistry<'_>,
    result: &RunResult,
) -> Option<RunFault> {
    if let Some(failure) = registry.failures().first() {
        return Some(RunFault::ButtonPressFailed {
            kind: failure.kind,
            button: failure.button.clone(),
            reason: failure.error.to_string(),
        });
    }
    registry
        .unclaimed()
        .first()
        .map(|text| RunFault::UnhandledInterruption {
            alert_text: text.clone(),
            unobserved: result.missing_kinds(),
        })
}

fn step_fault(
    step: &TriggerStep,
    error: DriverError,
    registry: &AlertInterceptionRegistry<'_>,
    result: &RunResult,
) -> RunFault {
    interception_fault(registry, result)
        .unwrap_or_else(|| driver_fault(&step.to_string(), error, result))
}

fn driver_fault(step: &str, error: DriverError, result: &RunResult) -> RunFault {
    match error {
        DriverError::UnhandledInterruption { alert_text } => RunFault::UnhandledInterruption {
            alert_text,
            unobserved: result.missing_kinds(),
        },
        other => RunFault::DriverFailure {
            step: step.to_string(),
            reason: other.to_string(),
        },
    }
}
