//! Construction of deployment condition expressions.
//!
//! The builder only checks that every compared parameter was declared in the
//! same pass; it never evaluates anything. Construction is pure: the same
//! arguments always produce equal trees.

use crate::error::{Result, check_name};
use crate::param::{Literal, Parameter, Parameters};

use super::expr::{BoolExpr, ConditionId};

#[derive(Debug, Clone, Copy)]
pub struct ConditionBuilder<'a> {
  params: &'a Parameters,
}

impl<'a> ConditionBuilder<'a> {
  pub fn new(params: &'a Parameters) -> Self {
    Self { params }
  }

  /// `param == value` at deployment time.
  ///
  /// # Errors
  ///
  /// `UnknownParameter` if `param` was not declared in this pass.
  pub fn equals(&self, param: &Parameter, value: impl Into<Literal>) -> Result<BoolExpr> {
    let symbol = param.symbol();
    self.params.check(&symbol)?;
    Ok(BoolExpr::Equals {
      param: symbol,
      value: value.into(),
    })
  }

  /// Like [`ConditionBuilder::equals`], looking the parameter up by name.
  pub fn equals_named(&self, name: &str, value: impl Into<Literal>) -> Result<BoolExpr> {
    let param = self.params.get(name)?;
    self.equals(param, value)
  }

  pub fn not(&self, operand: impl Into<BoolExpr>) -> BoolExpr {
    BoolExpr::Not(Box::new(operand.into()))
  }

  pub fn and(&self, left: impl Into<BoolExpr>, right: impl Into<BoolExpr>) -> BoolExpr {
    BoolExpr::And(Box::new(left.into()), Box::new(right.into()))
  }

  pub fn or(&self, left: impl Into<BoolExpr>, right: impl Into<BoolExpr>) -> BoolExpr {
    BoolExpr::Or(Box::new(left.into()), Box::new(right.into()))
  }

  /// By-name reference to a condition, which may be defined later.
  pub fn named(&self, name: &str) -> Result<BoolExpr> {
    check_name(name)?;
    Ok(BoolExpr::Condition(ConditionId::new(name)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::SynthError;
  use crate::param::ParamType;

  fn declared() -> (Parameters, Parameter) {
    let mut params = Parameters::new();
    let env = params.declare("env", ParamType::String, "env name").unwrap();
    (params, env)
  }

  #[test]
  fn structurally_equal_calls_give_equal_trees() {
    let (params, env) = declared();
    let b = ConditionBuilder::new(&params);

    let first = b.not(b.equals(&env, "prod").unwrap());
    let second = b.not(b.equals(&env, "prod").unwrap());
    assert_eq!(first, second);
  }

  #[test]
  fn undeclared_parameter_is_rejected() {
    let (params, _) = declared();
    let mut other = Parameters::new();
    let stage = other.declare("stage", ParamType::String, "").unwrap();

    let b = ConditionBuilder::new(&params);
    assert_eq!(
      b.equals(&stage, "prod"),
      Err(SynthError::UnknownParameter("stage".to_string()))
    );
    assert_eq!(
      b.equals_named("stage", "prod"),
      Err(SynthError::UnknownParameter("stage".to_string()))
    );
  }

  #[test]
  fn same_name_different_type_is_unknown() {
    let (params, _) = declared();
    let mut other = Parameters::new();
    let env_number = other.declare("env", ParamType::Number, "").unwrap();

    let b = ConditionBuilder::new(&params);
    assert!(matches!(b.equals(&env_number, "1"), Err(SynthError::UnknownParameter(_))));
  }

  #[test]
  fn combinators_nest() {
    let (params, env) = declared();
    let b = ConditionBuilder::new(&params);

    let expr = b.and(b.equals(&env, "prod").unwrap(), b.not(b.named("IsLegacy").unwrap()));
    assert_eq!(expr.to_string(), "(env == \"prod\" && !(IsLegacy))");
  }

  #[test]
  fn named_rejects_invalid_names() {
    let (params, _) = declared();
    let b = ConditionBuilder::new(&params);
    assert!(matches!(b.named("not valid"), Err(SynthError::InvalidName(_))));
  }
}
