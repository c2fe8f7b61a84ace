pub mod parse;
pub mod types;
pub mod validate;

pub use parse::{load_spec, parse_spec, LoadError, ParseError};
pub use types::{
    AlertSpec, HarnessSpec, PermissionDecision, PermissionKind, RunSettings, ScreenRule,
    TriggerStep,
};
pub use validate::{join_errors, validate_spec, ValidationError};
