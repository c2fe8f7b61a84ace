pub mod host;
pub mod registry;
pub mod simulated;

pub use host::{
    AlertDialog, CleanStateAttestation, DriverError, HostDriver, InterruptionMonitor, ResetMethod,
};
pub use registry::{
    AlertInterceptionRegistry, AlertObservation, InterceptionFailure, RegistryError, WatcherId,
};
pub use simulated::{AuthorizationStatus, DeviceEvent, SimulatedDevice};
