pub mod generate;
pub mod scenario;

pub use generate::{find, generate};
pub use scenario::Scenario;
