use crossbeam::channel;
use crossbeam::queue::ArrayQueue;
use preflight_driver::host::HostDriver;
use preflight_ir::parse::{load_spec, LoadError};
use preflight_ir::types::HarnessSpec;
use preflight_ir::validate::{join_errors, validate_spec, ValidationError};
use preflight_matrix::generate::{find, generate};
use preflight_matrix::scenario::Scenario;
use tracing::{info, warn};

use crate::result::{RunFault, RunResult};
use crate::runner::ScenarioRunner;

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("harness description has {} validation error(s): {}", .0.len(), join_errors(.0))]
    Invalid(Vec<ValidationError>),

    #[error("Unknown scenario: '{name}'")]
    UnknownScenario { name: String },

    #[error("Device pool is empty")]
    NoDevices,
}

/// A validated harness description and its full scenario matrix.
#[derive(Debug, Clone)]
pub struct Sweep {
    spec: HarnessSpec,
    scenarios: Vec<Scenario>,
}

impl Sweep {
    pub fn new(spec: HarnessSpec) -> Result<Self, HarnessError> {
        validate_spec(&spec).map_err(HarnessError::Invalid)?;
        let scenarios = generate(&spec.kinds());
        info!(harness = %spec.name, scenarios = scenarios.len(), "sweep prepared");
        Ok(Self { spec, scenarios })
    }

    pub fn from_json(json: &str) -> Result<Self, HarnessError> {
        Self::new(load_spec(json)?)
    }

    pub fn spec(&self) -> &HarnessSpec {
        &self.spec
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Every scenario, one after another, on a single device. A failing
    /// scenario never stops the sweep.
    pub fn run<D: HostDriver + ?Sized>(&self, driver: &mut D) -> Vec<RunResult> {
        let runner = ScenarioRunner::new(&self.spec);
        self.scenarios
            .iter()
            .map(|scenario| runner.run(driver, scenario))
            .collect()
    }

    /// Rerun a single scenario by its stable name.
    pub fn run_named<D: HostDriver + ?Sized>(
        &self,
        driver: &mut D,
        name: &str,
    ) -> Result<RunResult, HarnessError> {
        let scenario = find(&self.scenarios, name).ok_or_else(|| HarnessError::UnknownScenario {
            name: name.to_string(),
        })?;
        Ok(ScenarioRunner::new(&self.spec).run(driver, scenario))
    }

    /// Spread the matrix over isolated devices, one scenario per device at
    /// a time. Results come back in scenario order, one per scenario, even
    /// when a worker thread dies.
    pub fn run_pooled<D: HostDriver + Send>(
        &self,
        drivers: Vec<D>,
    ) -> Result<Vec<RunResult>, HarnessError> {
        if drivers.is_empty() {
            return Err(HarnessError::NoDevices);
        }

        let queue = ArrayQueue::new(self.scenarios.len().max(1));
        for scenario in &self.scenarios {
            // Capacity equals the matrix size.
            let _ = queue.push(scenario);
        }

        let runner = ScenarioRunner::new(&self.spec);
        let (tx, rx) = channel::unbounded::<RunResult>();
        info!(devices = drivers.len(), scenarios = self.scenarios.len(), "pooled sweep started");

        let joined = crossbeam::scope(|scope| {
            for mut driver in drivers {
                let queue = &queue;
                let tx = tx.clone();
                scope.spawn(move |_| {
                    while let Some(scenario) = queue.pop() {
                        let result = runner.run(&mut driver, scenario);
                        if tx.send(result).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(tx);

        let mut results: Vec<RunResult> = rx.try_iter().collect();
        if joined.is_err() {
            warn!(finished = results.len(), "device worker died mid-sweep");
        }
        // Anything still queued or lost with a dead worker is reported, not dropped.
        for scenario in &self.scenarios {
            if !results.iter().any(|r| r.scenario.index == scenario.index) {
                results.push(lost_result(scenario));
            }
        }
        results.sort_by_key(|r| r.scenario.index);
        Ok(results)
    }
}

fn lost_result(scenario: &Scenario) -> RunResult {
    let mut result = RunResult::new(scenario.clone(), "unassigned");
    result.faults.push(RunFault::DriverFailure {
        step: "device worker".to_string(),
        reason: "worker thread died before reporting this scenario".to_string(),
    });
    result.finalize();
    result
}
