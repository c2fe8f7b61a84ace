pub mod report;
pub mod result;
pub mod runner;
pub mod sweep;

pub use report::{ScenarioReport, SweepReport};
pub use result::{RunFault, RunPhase, RunResult, Verdict};
pub use runner::ScenarioRunner;
pub use sweep::{HarnessError, Sweep};
