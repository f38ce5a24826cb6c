use std::fmt;

use serde::{Deserialize, Serialize};

use crate::param::{Literal, Symbolic};

/// Logical name of a deployment condition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionId(pub String);

impl ConditionId {
  pub fn new(name: impl Into<String>) -> Self {
    ConditionId(name.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ConditionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Boolean expression evaluated by the provisioning system, never by synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoolExpr {
  Equals { param: Symbolic, value: Literal },
  Not(Box<BoolExpr>),
  And(Box<BoolExpr>, Box<BoolExpr>),
  Or(Box<BoolExpr>, Box<BoolExpr>),
  /// Reference to another named condition.
  Condition(ConditionId),
}

impl BoolExpr {
  /// Named conditions referenced anywhere in this tree.
  pub fn condition_refs(&self) -> Vec<&ConditionId> {
    let mut out = Vec::new();
    self.walk(&mut |e| {
      if let BoolExpr::Condition(id) = e {
        out.push(id);
      }
    });
    out
  }

  /// Parameters compared anywhere in this tree.
  pub fn parameter_refs(&self) -> Vec<&Symbolic> {
    let mut out = Vec::new();
    self.walk(&mut |e| {
      if let BoolExpr::Equals { param, .. } = e {
        out.push(param);
      }
    });
    out
  }

  fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a BoolExpr)) {
    visit(self);
    match self {
      BoolExpr::Not(inner) => inner.walk(visit),
      BoolExpr::And(l, r) | BoolExpr::Or(l, r) => {
        l.walk(visit);
        r.walk(visit);
      }
      BoolExpr::Equals { .. } | BoolExpr::Condition(_) => {}
    }
  }
}

impl fmt::Display for BoolExpr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BoolExpr::Equals { param, value } => write!(f, "{} == {:?}", param.name, value.as_str()),
      BoolExpr::Not(inner) => write!(f, "!({inner})"),
      BoolExpr::And(l, r) => write!(f, "({l} && {r})"),
      BoolExpr::Or(l, r) => write!(f, "({l} || {r})"),
      BoolExpr::Condition(id) => write!(f, "{id}"),
    }
  }
}

/// A named condition registered with a graph.
///
/// Resources attach conditions by name, so every resource guarded by the same
/// `DeploymentCondition` shares one condition object in the artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeploymentCondition {
  id: ConditionId,
  expr: BoolExpr,
}

impl DeploymentCondition {
  pub(crate) fn new(id: ConditionId, expr: BoolExpr) -> Self {
    Self { id, expr }
  }

  pub fn id(&self) -> &ConditionId {
    &self.id
  }

  pub fn expr(&self) -> &BoolExpr {
    &self.expr
  }
}

impl From<&DeploymentCondition> for BoolExpr {
  fn from(value: &DeploymentCondition) -> Self {
    BoolExpr::Condition(value.id.clone())
  }
}

impl From<DeploymentCondition> for BoolExpr {
  fn from(value: DeploymentCondition) -> Self {
    BoolExpr::Condition(value.id)
  }
}
