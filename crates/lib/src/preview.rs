//! Deployment preview.
//!
//! Models what the provisioning system materializes from an emitted artifact
//! for one set of concrete parameter values: which conditions hold, which
//! resources exist, and what their deferred references become. This runs on a
//! finished artifact and is never part of synthesis.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::condition::{BoolExpr, ConditionId, ConditionSet};
use crate::emit::Artifact;
use crate::error::SynthError;
use crate::graph::{AttrValue, Attributes, ResourceId, ResourceKind};
use crate::param::{Literal, ParamType, Parameter};
use crate::reference::{self, ReferenceError, Resolver};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreviewError {
  #[error("no value bound for parameter '{0}'")]
  UnboundParameter(String),

  #[error("value bound for undeclared parameter '{0}'")]
  UnknownParameter(String),

  #[error("parameter '{name}' is {param_type}, got '{value}'")]
  InvalidValue {
    name: String,
    param_type: ParamType,
    value: String,
  },

  #[error("unknown condition '{0}'")]
  UnknownCondition(String),

  #[error("cyclic condition expression through '{0}'")]
  CyclicExpression(String),

  #[error("malformed binding '{0}', expected NAME=VALUE")]
  MalformedBinding(String),

  #[error(transparent)]
  Reference(#[from] ReferenceError),

  #[error(transparent)]
  Synth(#[from] SynthError),
}

pub type Result<T> = std::result::Result<T, PreviewError>;

/// Concrete parameter values for one deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Bindings(BTreeMap<String, String>);

impl Bindings {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, name: &str, value: &str) -> Self {
    self.0.insert(name.to_string(), value.to_string());
    self
  }

  /// Parse `NAME=VALUE` pairs, as given on a command line.
  pub fn parse<'a>(pairs: impl IntoIterator<Item = &'a str>) -> Result<Self> {
    let mut bindings = Self::new();
    for pair in pairs {
      let (name, value) = pair
        .split_once('=')
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| PreviewError::MalformedBinding(pair.to_string()))?;
      bindings.0.insert(name.to_string(), value.to_string());
    }
    Ok(bindings)
  }

  pub fn get(&self, name: &str) -> Option<&str> {
    self.0.get(name).map(String::as_str)
  }
}

/// A resource as it would exist in the previewed deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterializedResource {
  pub id: ResourceId,
  pub kind: ResourceKind,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub condition: Option<ConditionId>,
  pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
  pub stack: String,
  pub bindings: Bindings,
  pub conditions: BTreeMap<ConditionId, bool>,
  pub resources: BTreeMap<ResourceId, MaterializedResource>,
  /// Resources whose condition is false in this deployment.
  pub omitted: Vec<ResourceId>,
}

impl Preview {
  pub fn contains(&self, id: &str) -> bool {
    self.resources.contains_key(&ResourceId::new(id))
  }

  pub fn count(&self, kind: ResourceKind) -> usize {
    self.resources.values().filter(|r| r.kind == kind).count()
  }
}

/// Instantiate `artifact` for `bindings`.
///
/// # Errors
///
/// Every declared parameter needs a binding of the declared type, and no
/// binding may name an undeclared parameter.
pub fn instantiate(artifact: &Artifact, bindings: &Bindings) -> Result<Preview> {
  let values = bind_parameters(artifact, bindings)?;

  let mut evaluator = Evaluator::new(artifact.conditions(), &values);
  let mut conditions = BTreeMap::new();
  for (id, _) in artifact.conditions().iter() {
    conditions.insert(id.clone(), evaluator.condition(id)?);
  }

  let present: BTreeSet<&ResourceId> = artifact
    .resources()
    .values()
    .filter(|def| def.condition.as_ref().is_none_or(|c| conditions[c]))
    .map(|def| &def.id)
    .collect();

  let resolver = DeploymentResolver {
    values: &values,
    present: &present,
  };

  let mut resources = BTreeMap::new();
  let mut omitted = Vec::new();
  for def in artifact.resources().values() {
    if !present.contains(&def.id) {
      omitted.push(def.id.clone());
      continue;
    }
    let mut attributes = Attributes::new();
    for (key, value) in def.attributes.iter() {
      attributes = attributes.with(key, resolve_value(value, &resolver)?);
    }
    resources.insert(
      def.id.clone(),
      MaterializedResource {
        id: def.id.clone(),
        kind: def.kind,
        condition: def.condition.clone(),
        attributes,
      },
    );
  }

  debug!(
    stack = artifact.stack(),
    present = resources.len(),
    omitted = omitted.len(),
    "instantiated artifact"
  );

  Ok(Preview {
    stack: artifact.stack().to_string(),
    bindings: bindings.clone(),
    conditions,
    resources,
    omitted,
  })
}

/// Evaluate a single expression against `conditions` and parameter values.
pub fn evaluate(expr: &BoolExpr, conditions: &ConditionSet, values: &BTreeMap<String, Literal>) -> Result<bool> {
  Evaluator::new(conditions, values).expr(expr)
}

fn bind_parameters(artifact: &Artifact, bindings: &Bindings) -> Result<BTreeMap<String, Literal>> {
  if let Some(name) = bindings.0.keys().find(|name| !artifact.parameters().contains_key(*name)) {
    return Err(PreviewError::UnknownParameter(name.clone()));
  }

  let mut values = BTreeMap::new();
  for (name, decl) in artifact.parameters() {
    let raw = bindings
      .get(name)
      .ok_or_else(|| PreviewError::UnboundParameter(name.clone()))?;
    check_type(name, decl.param_type, raw)?;

    let param = Parameter::symbolic(name, decl.param_type, &decl.description).bind(Literal::from(raw));
    values.insert(name.clone(), param.resolved_value()?.clone());
  }
  Ok(values)
}

fn check_type(name: &str, param_type: ParamType, value: &str) -> Result<()> {
  let valid = match param_type {
    ParamType::String | ParamType::CommaDelimitedList => true,
    ParamType::Number => value.parse::<f64>().is_ok(),
  };
  if valid {
    Ok(())
  } else {
    Err(PreviewError::InvalidValue {
      name: name.to_string(),
      param_type,
      value: value.to_string(),
    })
  }
}

struct Evaluator<'a> {
  conditions: &'a ConditionSet,
  values: &'a BTreeMap<String, Literal>,
  memo: BTreeMap<ConditionId, bool>,
  visiting: BTreeSet<ConditionId>,
}

impl<'a> Evaluator<'a> {
  fn new(conditions: &'a ConditionSet, values: &'a BTreeMap<String, Literal>) -> Self {
    Self {
      conditions,
      values,
      memo: BTreeMap::new(),
      visiting: BTreeSet::new(),
    }
  }

  fn condition(&mut self, id: &ConditionId) -> Result<bool> {
    if let Some(&value) = self.memo.get(id) {
      return Ok(value);
    }
    if !self.visiting.insert(id.clone()) {
      return Err(PreviewError::CyclicExpression(id.0.clone()));
    }

    let conditions = self.conditions;
    let expr = conditions
      .get(id)
      .ok_or_else(|| PreviewError::UnknownCondition(id.0.clone()))?;
    let value = self.expr(expr)?;

    self.visiting.remove(id);
    self.memo.insert(id.clone(), value);
    Ok(value)
  }

  fn expr(&mut self, expr: &BoolExpr) -> Result<bool> {
    Ok(match expr {
      BoolExpr::Equals { param, value } => {
        let bound = self
          .values
          .get(&param.name)
          .ok_or_else(|| PreviewError::UnboundParameter(param.name.clone()))?;
        bound == value
      }
      BoolExpr::Not(inner) => !self.expr(inner)?,
      BoolExpr::And(l, r) => self.expr(l)? && self.expr(r)?,
      BoolExpr::Or(l, r) => self.expr(l)? || self.expr(r)?,
      BoolExpr::Condition(id) => self.condition(id)?,
    })
  }
}

struct DeploymentResolver<'a> {
  values: &'a BTreeMap<String, Literal>,
  present: &'a BTreeSet<&'a ResourceId>,
}

impl Resolver for DeploymentResolver<'_> {
  fn resolve_parameter(&self, name: &str) -> std::result::Result<String, ReferenceError> {
    self
      .values
      .get(name)
      .map(|v| v.as_str().to_string())
      .ok_or_else(|| ReferenceError::UnresolvedParameter(name.to_string()))
  }

  /// Physical names are assigned by the provisioning system; show `<id>`.
  fn resolve_resource(&self, id: &str, attribute: &str) -> std::result::Result<String, ReferenceError> {
    if self.present.contains(&ResourceId::new(id)) {
      Ok(format!("<{id}>"))
    } else {
      Err(ReferenceError::UnresolvedResource {
        id: id.to_string(),
        attribute: attribute.to_string(),
      })
    }
  }
}

fn resolve_value(value: &AttrValue, resolver: &impl Resolver) -> Result<AttrValue> {
  Ok(match value {
    AttrValue::Ref(r) => AttrValue::String(reference::resolve(r, resolver)?),
    AttrValue::Template(t) => AttrValue::String(reference::substitute_segments(t.segments(), resolver)?),
    AttrValue::List(items) => AttrValue::List(
      items
        .iter()
        .map(|v| resolve_value(v, resolver))
        .collect::<Result<Vec<_>>>()?,
    ),
    AttrValue::Map(map) => AttrValue::Map(
      map
        .iter()
        .map(|(k, v)| Ok((k.clone(), resolve_value(v, resolver)?)))
        .collect::<Result<BTreeMap<_, _>>>()?,
    ),
    AttrValue::String(_) | AttrValue::Number(_) | AttrValue::Bool(_) => value.clone(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::graph::{GraphBuilder, Rate};
  use crate::reference::DeferredRef;

  fn artifact() -> Artifact {
    let mut g = GraphBuilder::new("preview-test");
    let env = g.declare_parameter("env", ParamType::String, "").unwrap();
    let expr = g.conditions().equals(&env, "prod").unwrap();
    let is_prod = g.define_condition("IsProd", expr).unwrap();
    let expr = g.conditions().not(&is_prod);
    let is_dev = g.define_condition("IsDev", expr).unwrap();

    g.define("bucket", ResourceKind::Storage, Attributes::new(), None)
      .unwrap();
    let attrs = Attributes::new()
      .with("BUCKET", DeferredRef::resource("bucket", "name"))
      .with("ENV", env.reference());
    g.define("fn", ResourceKind::Compute, attrs, None).unwrap();
    g.schedule("Prod", "fn", Rate::minutes(60), Some(&is_prod)).unwrap();
    g.schedule("Dev", "fn", Rate::minutes(5), Some(&is_dev)).unwrap();
    crate::emit::emit(&g.finish().unwrap()).unwrap()
  }

  #[test]
  fn prod_materializes_prod_branch_only() {
    let preview = instantiate(&artifact(), &Bindings::new().with("env", "prod")).unwrap();

    assert!(preview.contains("Prod"));
    assert!(preview.contains("ProdLambdaPerms"));
    assert!(!preview.contains("Dev"));
    assert!(!preview.contains("DevLambdaPerms"));
    assert!(preview.conditions[&ConditionId::new("IsProd")]);
    assert_eq!(preview.omitted.len(), 2);
  }

  #[test]
  fn any_other_value_materializes_dev_branch() {
    let preview = instantiate(&artifact(), &Bindings::new().with("env", "staging")).unwrap();
    assert!(preview.contains("Dev"));
    assert!(!preview.contains("Prod"));
    assert_eq!(preview.count(ResourceKind::Schedule), 1);
  }

  #[test]
  fn references_are_substituted() {
    let preview = instantiate(&artifact(), &Bindings::new().with("env", "dev")).unwrap();
    let function = &preview.resources[&ResourceId::new("fn")];
    assert_eq!(function.attributes.get("BUCKET"), Some(&AttrValue::from("<bucket>")));
    assert_eq!(function.attributes.get("ENV"), Some(&AttrValue::from("dev")));
  }

  #[test]
  fn missing_and_unknown_bindings_fail() {
    assert_eq!(
      instantiate(&artifact(), &Bindings::new()),
      Err(PreviewError::UnboundParameter("env".to_string()))
    );
    assert_eq!(
      instantiate(&artifact(), &Bindings::new().with("env", "prod").with("stage", "x")),
      Err(PreviewError::UnknownParameter("stage".to_string()))
    );
  }

  #[test]
  fn number_parameters_are_type_checked() {
    let mut g = GraphBuilder::new("numbers");
    g.declare_parameter("replicas", ParamType::Number, "").unwrap();
    let artifact = crate::emit::emit(&g.finish().unwrap()).unwrap();

    assert!(instantiate(&artifact, &Bindings::new().with("replicas", "3")).is_ok());
    assert!(matches!(
      instantiate(&artifact, &Bindings::new().with("replicas", "three")),
      Err(PreviewError::InvalidValue { .. })
    ));
  }

  #[test]
  fn bindings_parse_from_pairs() {
    let bindings = Bindings::parse(["env=prod", "note=a=b"]).unwrap();
    assert_eq!(bindings.get("env"), Some("prod"));
    assert_eq!(bindings.get("note"), Some("a=b"));

    assert_eq!(
      Bindings::parse(["env"]),
      Err(PreviewError::MalformedBinding("env".to_string()))
    );
    assert!(Bindings::parse(["=prod"]).is_err());
  }

  #[test]
  fn evaluate_detects_cycles() {
    let mut value = serde_json::Map::new();
    value.insert("A".to_string(), serde_json::json!({ "condition": "B" }));
    value.insert("B".to_string(), serde_json::json!({ "not": { "condition": "A" } }));
    let set: ConditionSet = serde_json::from_value(serde_json::Value::Object(value)).unwrap();

    let err = evaluate(&BoolExpr::Condition(ConditionId::new("A")), &set, &BTreeMap::new()).unwrap_err();
    assert!(matches!(err, PreviewError::CyclicExpression(_)));
  }
}
