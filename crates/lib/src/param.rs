//! Deployment parameters.
//!
//! A parameter declared during synthesis is a *symbolic* handle: it has a name
//! and a type, but its value only exists once the provisioning system
//! instantiates the stack. [`Symbolic`] and [`Literal`] are separate types and
//! there is no conversion from one to the other, so a parameter can't leak
//! into code that decides what to emit.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SynthError, check_name};
use crate::reference::DeferredRef;

/// Declared type of a deployment parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParamType {
  String,
  Number,
  CommaDelimitedList,
}

impl ParamType {
  pub const fn as_str(&self) -> &'static str {
    match self {
      ParamType::String => "String",
      ParamType::Number => "Number",
      ParamType::CommaDelimitedList => "CommaDelimitedList",
    }
  }
}

impl fmt::Display for ParamType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A value known at synthesis time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Literal(String);

impl Literal {
  pub fn new(value: impl Into<String>) -> Self {
    Literal(value.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl From<&str> for Literal {
  fn from(value: &str) -> Self {
    Literal::new(value)
  }
}

impl From<String> for Literal {
  fn from(value: String) -> Self {
    Literal(value)
  }
}

impl fmt::Display for Literal {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Identity of a parameter whose value is not yet known.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbolic {
  pub name: String,
  #[serde(rename = "type")]
  pub param_type: ParamType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
  Symbolic(Symbolic),
  Literal(Literal),
}

/// Handle returned by [`Parameters::declare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
  name: String,
  param_type: ParamType,
  description: String,
  value: ParamValue,
}

impl Parameter {
  pub(crate) fn symbolic(name: &str, param_type: ParamType, description: &str) -> Self {
    Self {
      name: name.to_string(),
      param_type,
      description: description.to_string(),
      value: ParamValue::Symbolic(Symbolic {
        name: name.to_string(),
        param_type,
      }),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn param_type(&self) -> ParamType {
    self.param_type
  }

  pub fn description(&self) -> &str {
    &self.description
  }

  pub fn value(&self) -> &ParamValue {
    &self.value
  }

  pub fn symbol(&self) -> Symbolic {
    Symbolic {
      name: self.name.clone(),
      param_type: self.param_type,
    }
  }

  /// Deferred reference for interpolation into resource attributes.
  pub fn reference(&self) -> DeferredRef {
    DeferredRef::parameter(&self.name)
  }

  /// The concrete value, available only after instantiation.
  ///
  /// # Errors
  ///
  /// Returns [`SynthError::PrematureResolution`] while the value is symbolic.
  pub fn resolved_value(&self) -> Result<&Literal> {
    match &self.value {
      ParamValue::Literal(value) => Ok(value),
      ParamValue::Symbolic(s) => Err(SynthError::PrematureResolution(s.name.clone())),
    }
  }

  /// Bind a concrete value, as the provisioning system does at instantiation.
  pub(crate) fn bind(mut self, value: Literal) -> Self {
    self.value = ParamValue::Literal(value);
    self
  }

  pub fn decl(&self) -> ParameterDecl {
    ParameterDecl {
      param_type: self.param_type,
      description: self.description.clone(),
    }
  }
}

/// Serialized form of a declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDecl {
  #[serde(rename = "type")]
  pub param_type: ParamType,
  pub description: String,
}

/// Registry of declared parameters for one synthesis pass.
#[derive(Debug, Clone, Default)]
pub struct Parameters {
  declared: BTreeMap<String, Parameter>,
}

impl Parameters {
  pub fn new() -> Self {
    Self::default()
  }

  /// Declare a deployment parameter.
  ///
  /// Declaring the same name and type twice returns the existing handle.
  ///
  /// # Errors
  ///
  /// `InvalidName` for an unusable name, `DuplicateParameter` when the name is
  /// already declared with another type.
  pub fn declare(&mut self, name: &str, param_type: ParamType, description: &str) -> Result<Parameter> {
    check_name(name)?;

    if let Some(existing) = self.declared.get(name) {
      if existing.param_type != param_type {
        return Err(SynthError::DuplicateParameter {
          name: name.to_string(),
          existing: existing.param_type.to_string(),
          requested: param_type.to_string(),
        });
      }
      return Ok(existing.clone());
    }

    debug!(name, %param_type, "declared parameter");
    let param = Parameter::symbolic(name, param_type, description);
    self.declared.insert(name.to_string(), param.clone());
    Ok(param)
  }

  pub fn get(&self, name: &str) -> Result<&Parameter> {
    self
      .declared
      .get(name)
      .ok_or_else(|| SynthError::UnknownParameter(name.to_string()))
  }

  /// Check a symbol against the registry by name and type.
  pub fn check(&self, symbol: &Symbolic) -> Result<()> {
    match self.declared.get(&symbol.name) {
      Some(p) if p.param_type == symbol.param_type => Ok(()),
      _ => Err(SynthError::UnknownParameter(symbol.name.clone())),
    }
  }

  pub fn contains(&self, name: &str) -> bool {
    self.declared.contains_key(name)
  }

  pub fn len(&self) -> usize {
    self.declared.len()
  }

  pub fn is_empty(&self) -> bool {
    self.declared.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
    self.declared.values()
  }

  pub fn decls(&self) -> BTreeMap<String, ParameterDecl> {
    self
      .declared
      .iter()
      .map(|(name, p)| (name.clone(), p.decl()))
      .collect()
  }
}
