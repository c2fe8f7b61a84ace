use crate::types::HarnessSpec;
use crate::validate::{join_errors, validate_spec, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("harness description has {} validation error(s): {}", .0.len(), join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

pub fn parse_spec(json: &str) -> Result<HarnessSpec, ParseError> {
    Ok(serde_json::from_str(json)?)
}

/// Parse and validate in one step.
pub fn load_spec(json: &str) -> Result<HarnessSpec, LoadError> {
    let spec = parse_spec(json)?;
    validate_spec(&spec).map_err(LoadError::Invalid)?;
    Ok(spec)
}
