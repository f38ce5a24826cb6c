//! Permission binding.
//!
//! A grant must never exist in a deployment where either endpoint doesn't, so
//! its condition is the conjunction of both endpoints' conditions.

use tracing::debug;

use crate::condition::{BoolExpr, ConditionId};
use crate::error::{Result, SynthError};
use crate::reference::DeferredRef;

use super::builder::GraphBuilder;
use super::types::{Attributes, PermissionGrant, ResourceId, ResourceKind};

impl GraphBuilder {
  /// Grant `source` permission to perform `action` on `target`.
  ///
  /// The permission resource is named `<source>-<target>-grant`.
  pub fn grant(&mut self, source: &str, target: &str, action: &str) -> Result<PermissionGrant> {
    let id = format!("{source}-{target}-grant");
    self.grant_as(&id, source, target, action, None)
  }

  /// Like [`GraphBuilder::grant`], with an explicit permission id and principal.
  ///
  /// # Errors
  ///
  /// `GraphIntegrity` if either endpoint is missing, the endpoints coincide, or
  /// the action is empty.
  pub fn grant_as(
    &mut self,
    id: &str,
    source: &str,
    target: &str,
    action: &str,
    principal: Option<&str>,
  ) -> Result<PermissionGrant> {
    if source == target {
      return Err(SynthError::GraphIntegrity(format!(
        "grant '{id}' has the same source and target '{source}'"
      )));
    }
    if action.is_empty() {
      return Err(SynthError::GraphIntegrity(format!("grant '{id}' has no action")));
    }

    if self.resource(id).is_some() {
      return Err(SynthError::DuplicateResource(id.to_string()));
    }

    let source_condition = self.endpoint_condition(id, source)?;
    let target_condition = self.endpoint_condition(id, target)?;
    let condition = self.conjoin(source_condition.as_ref(), target_condition.as_ref())?;

    let mut attributes = Attributes::new()
      .with("action", action)
      .with("source", DeferredRef::resource(source, "arn"))
      .with("target", DeferredRef::resource(target, "arn"));
    if let Some(principal) = principal {
      attributes = attributes.with("principal", principal);
    }

    let def = self.insert(id, ResourceKind::PermissionGrant, attributes, condition)?;
    let grant = PermissionGrant {
      id: def.id.clone(),
      source: ResourceId::new(source),
      target: ResourceId::new(target),
      action: action.to_string(),
      principal: principal.map(str::to_string),
      condition: def.condition,
    };
    debug!(id, source, target, action, condition = ?grant.condition, "derived grant");
    self.grants.insert(def.id, grant.clone());
    Ok(grant)
  }

  fn endpoint_condition(&self, grant: &str, endpoint: &str) -> Result<Option<ConditionId>> {
    self
      .resource(endpoint)
      .map(|def| def.condition.clone())
      .ok_or_else(|| SynthError::GraphIntegrity(format!("grant '{grant}' references '{endpoint}', which is not in the graph")))
  }

  /// Narrowest condition implying both `a` and `b` (absent = always true).
  ///
  /// Reuses `a` or `b` when one already implies the other, then any condition
  /// already defined as exactly `And(a, b)`. Otherwise registers
  /// `<first>And<second>` with the names in sorted order, so the result does
  /// not depend on argument order. A name already taken by another expression
  /// gets the first free numeric suffix.
  pub(crate) fn conjoin(&mut self, a: Option<&ConditionId>, b: Option<&ConditionId>) -> Result<Option<ConditionId>> {
    let (a, b) = match (a, b) {
      (None, None) => return Ok(None),
      (Some(c), None) | (None, Some(c)) => return Ok(Some(c.clone())),
      (Some(a), Some(b)) => (a, b),
    };

    if self.conditions.implies(Some(a), Some(b)) {
      return Ok(Some(a.clone()));
    }
    if self.conditions.implies(Some(b), Some(a)) {
      return Ok(Some(b.clone()));
    }

    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    let expr = BoolExpr::And(
      Box::new(BoolExpr::Condition(first.clone())),
      Box::new(BoolExpr::Condition(second.clone())),
    );
    if let Some((existing, _)) = self.conditions.iter().find(|(_, e)| **e == expr) {
      return Ok(Some(existing.clone()));
    }

    let base = format!("{first}And{second}");
    let mut id = ConditionId::new(base.as_str());
    let mut suffix = 2;
    while self.conditions.contains(&id) {
      id = ConditionId::new(format!("{base}{suffix}"));
      suffix += 1;
    }

    self.conditions.insert(id.clone(), expr)?;
    debug!(condition = %id, "derived conjunction");
    Ok(Some(id))
  }
}
