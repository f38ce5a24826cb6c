//! Synthesis errors.
//!
//! Every variant is fatal: the pass that raised it is abandoned and no artifact
//! is produced.

use thiserror::Error;

use crate::reference::ReferenceError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthError {
  /// A symbolic parameter's value was read before deployment instantiation.
  #[error("parameter '{0}' is symbolic until deployment; its value cannot be read during synthesis")]
  PrematureResolution(String),

  #[error("unknown parameter '{0}': declare it before referencing it")]
  UnknownParameter(String),

  #[error("parameter '{name}' already declared as {existing}, cannot redeclare as {requested}")]
  DuplicateParameter {
    name: String,
    existing: String,
    requested: String,
  },

  #[error("graph integrity violation: {0}")]
  GraphIntegrity(String),

  #[error("cyclic condition expression through '{0}'")]
  CyclicExpression(String),

  #[error("unknown condition '{0}'")]
  UnknownCondition(String),

  #[error("condition '{0}' already defined with a different expression")]
  DuplicateCondition(String),

  #[error("resource '{0}' already defined")]
  DuplicateResource(String),

  #[error("invalid schedule rate for '{0}': rate must be at least 1")]
  InvalidRate(String),

  #[error("invalid logical name '{0}'")]
  InvalidName(String),

  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  #[error("invalid template: {0}")]
  Reference(#[from] ReferenceError),

  #[error("artifact format error: {0}")]
  Format(String),
}

pub type Result<T> = std::result::Result<T, SynthError>;

/// Logical names: non-empty, ASCII alphanumerics plus `-` and `_`.
pub(crate) fn check_name(name: &str) -> Result<()> {
  let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
  if valid {
    Ok(())
  } else {
    Err(SynthError::InvalidName(name.to_string()))
  }
}
