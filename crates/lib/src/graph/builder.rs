//! Resource graph assembly.
//!
//! [`GraphBuilder`] is owned by one synthesis pass. Each call validates what it
//! adds against what is already there, so the graph is consistent at every
//! step; [`GraphBuilder::finish`] consumes the builder and yields an immutable
//! [`Graph`].

use std::collections::BTreeMap;

use tracing::debug;

use crate::condition::{BoolExpr, ConditionBuilder, ConditionId, ConditionSet, DeploymentCondition};
use crate::consts::{INVOKE_ACTION, SCHEDULE_PRINCIPAL};
use crate::error::{Result, SynthError, check_name};
use crate::param::{ParamType, Parameter, Parameters};
use crate::reference::DeferredRef;

use super::types::{
  AttrValue, Attributes, PermissionGrant, Rate, ResourceDefinition, ResourceId, ResourceKind, ScheduleBinding,
};

pub struct GraphBuilder {
  name: String,
  pub(super) params: Parameters,
  pub(super) conditions: ConditionSet,
  pub(super) resources: BTreeMap<ResourceId, ResourceDefinition>,
  pub(super) grants: BTreeMap<ResourceId, PermissionGrant>,
  schedules: BTreeMap<ResourceId, ScheduleBinding>,
}

impl GraphBuilder {
  pub fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      params: Parameters::new(),
      conditions: ConditionSet::new(),
      resources: BTreeMap::new(),
      grants: BTreeMap::new(),
      schedules: BTreeMap::new(),
    }
  }

  pub fn declare_parameter(&mut self, name: &str, param_type: ParamType, description: &str) -> Result<Parameter> {
    self.params.declare(name, param_type, description)
  }

  pub fn parameters(&self) -> &Parameters {
    &self.params
  }

  /// Expression builder over this graph's parameters.
  pub fn conditions(&self) -> ConditionBuilder<'_> {
    ConditionBuilder::new(&self.params)
  }

  /// Register a named deployment condition.
  pub fn define_condition(&mut self, name: &str, expr: impl Into<BoolExpr>) -> Result<DeploymentCondition> {
    check_name(name)?;
    let expr = expr.into();
    for symbol in expr.parameter_refs() {
      self.params.check(symbol)?;
    }

    let id = ConditionId::new(name);
    self.conditions.insert(id.clone(), expr.clone())?;
    debug!(condition = name, %expr, "defined deployment condition");
    Ok(DeploymentCondition::new(id, expr))
  }

  pub fn resource(&self, id: &str) -> Option<&ResourceDefinition> {
    self.resources.get(&ResourceId::new(id))
  }

  /// Define a storage or compute resource.
  ///
  /// Schedules and permission grants carry extra invariants and are added
  /// through [`GraphBuilder::schedule`] and [`GraphBuilder::grant`].
  ///
  /// # Errors
  ///
  /// - `GraphIntegrity` for a schedule/grant kind, or an attribute referencing a
  ///   resource that is missing or conditionally absent where this one exists
  /// - `UnknownParameter` for a reference to an undeclared parameter
  /// - `UnknownCondition` if `condition` was not defined on this builder
  /// - `DuplicateResource` / `InvalidName` for a bad id
  pub fn define(
    &mut self,
    id: &str,
    kind: ResourceKind,
    attributes: Attributes,
    condition: Option<&DeploymentCondition>,
  ) -> Result<ResourceDefinition> {
    match kind {
      ResourceKind::Schedule => {
        return Err(SynthError::GraphIntegrity(format!(
          "schedule '{id}' must be added with schedule() so its invoke permission is bound with it"
        )));
      }
      ResourceKind::PermissionGrant => {
        return Err(SynthError::GraphIntegrity(format!(
          "permission '{id}' must be derived with grant() from its endpoints"
        )));
      }
      ResourceKind::Storage | ResourceKind::Compute => {}
    }

    let condition = self.attach(condition)?;
    self.insert(id, kind, attributes, condition)
  }

  /// Add a schedule rule invoking `target` at `rate`, with its invoke permission.
  ///
  /// The rule and the permission always carry the same condition: the branch
  /// condition conjoined with the target's own.
  pub fn schedule(
    &mut self,
    rule_id: &str,
    target: &str,
    rate: Rate,
    condition: Option<&DeploymentCondition>,
  ) -> Result<ScheduleBinding> {
    if rate.value == 0 {
      return Err(SynthError::InvalidRate(rule_id.to_string()));
    }

    let target_def = self
      .resource(target)
      .ok_or_else(|| SynthError::GraphIntegrity(format!("schedule '{rule_id}' targets unknown resource '{target}'")))?;
    if target_def.kind != ResourceKind::Compute {
      return Err(SynthError::GraphIntegrity(format!(
        "schedule '{rule_id}' targets '{target}', which is {} rather than compute",
        target_def.kind
      )));
    }
    let target_condition = target_def.condition.clone();

    let permission_id = format!("{rule_id}LambdaPerms");
    for id in [rule_id, permission_id.as_str()] {
      if self.resource(id).is_some() {
        return Err(SynthError::DuplicateResource(id.to_string()));
      }
    }

    let branch = self.attach(condition)?;
    let rule_condition = self.conjoin(branch.as_ref(), target_condition.as_ref())?;

    let target_entry = Attributes::new()
      .with("id", format!("{rule_id}Target"))
      .with("arn", DeferredRef::resource(target, "arn"));
    let attributes = Attributes::new()
      .with("schedule_expression", rate.to_string())
      .with("state", "ENABLED")
      .with("targets", vec![AttrValue::from(target_entry)]);

    let rule = self.insert(rule_id, ResourceKind::Schedule, attributes, rule_condition)?;
    let grant = self.grant_as(&permission_id, rule_id, target, INVOKE_ACTION, Some(SCHEDULE_PRINCIPAL))?;

    if grant.condition != rule.condition {
      return Err(SynthError::GraphIntegrity(format!(
        "schedule '{rule_id}' and its permission '{permission_id}' carry different conditions"
      )));
    }

    let binding = ScheduleBinding {
      rule: rule.id.clone(),
      target: ResourceId::new(target),
      permission: grant.id,
      rate,
      condition: rule.condition,
    };
    debug!(rule = rule_id, target, %rate, condition = ?binding.condition, "bound schedule");
    self.schedules.insert(rule.id, binding.clone());
    Ok(binding)
  }

  /// Consume the builder.
  ///
  /// # Errors
  ///
  /// `UnknownCondition` if a condition references a name never defined.
  pub fn finish(self) -> Result<Graph> {
    check_name(&self.name)?;
    self.conditions.check_defined()?;

    Ok(Graph {
      name: self.name,
      parameters: self.params,
      conditions: self.conditions,
      resources: self.resources,
      grants: self.grants,
      schedules: self.schedules,
    })
  }

  /// Resolve a caller-supplied condition to one registered here.
  fn attach(&self, condition: Option<&DeploymentCondition>) -> Result<Option<ConditionId>> {
    let Some(condition) = condition else {
      return Ok(None);
    };
    match self.conditions.get(condition.id()) {
      Some(expr) if expr == condition.expr() => Ok(Some(condition.id().clone())),
      _ => Err(SynthError::UnknownCondition(condition.id().0.clone())),
    }
  }

  pub(super) fn insert(
    &mut self,
    id: &str,
    kind: ResourceKind,
    attributes: Attributes,
    condition: Option<ConditionId>,
  ) -> Result<ResourceDefinition> {
    check_name(id)?;
    let id = ResourceId::new(id);
    if self.resources.contains_key(&id) {
      return Err(SynthError::DuplicateResource(id.0));
    }

    self.check_references(&id, &attributes, condition.as_ref())?;

    let def = ResourceDefinition {
      id: id.clone(),
      kind,
      attributes,
      condition,
    };
    debug!(id = %def.id, %kind, condition = ?def.condition, "defined resource");
    self.resources.insert(id, def.clone());
    Ok(def)
  }

  fn check_references(&self, id: &ResourceId, attributes: &Attributes, condition: Option<&ConditionId>) -> Result<()> {
    for reference in attributes.references() {
      match reference {
        DeferredRef::Parameter(name) => {
          self.params.get(name)?;
        }
        DeferredRef::Resource { id: referenced, .. } => {
          if referenced == id {
            return Err(SynthError::GraphIntegrity(format!("'{id}' references itself")));
          }
          let def = self.resources.get(referenced).ok_or_else(|| {
            SynthError::GraphIntegrity(format!("'{id}' references unknown resource '{referenced}'"))
          })?;
          if !self.conditions.implies(condition, def.condition.as_ref()) {
            return Err(SynthError::GraphIntegrity(format!(
              "'{id}' references '{referenced}', which is absent in some deployments where '{id}' exists"
            )));
          }
        }
      }
    }
    Ok(())
  }
}

/// A finished resource graph. Immutable.
#[derive(Debug, Clone)]
pub struct Graph {
  name: String,
  parameters: Parameters,
  conditions: ConditionSet,
  resources: BTreeMap<ResourceId, ResourceDefinition>,
  grants: BTreeMap<ResourceId, PermissionGrant>,
  schedules: BTreeMap<ResourceId, ScheduleBinding>,
}

impl Graph {
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn parameters(&self) -> &Parameters {
    &self.parameters
  }

  pub fn conditions(&self) -> &ConditionSet {
    &self.conditions
  }

  pub fn resources(&self) -> &BTreeMap<ResourceId, ResourceDefinition> {
    &self.resources
  }

  pub fn grants(&self) -> &BTreeMap<ResourceId, PermissionGrant> {
    &self.grants
  }

  pub fn schedules(&self) -> &BTreeMap<ResourceId, ScheduleBinding> {
    &self.schedules
  }
}
