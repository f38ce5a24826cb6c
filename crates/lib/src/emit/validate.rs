//! Final assertion pass over an artifact.
//!
//! The builder already enforces all of this incrementally; this pass runs the
//! same checks on the serialized shape, so artifacts loaded from disk get them
//! too.

use crate::error::{Result, SynthError, check_name};
use crate::graph::{ResourceKind, ScheduleBinding};
use crate::reference::DeferredRef;
use crate::util::hash::Hashable;

use super::Artifact;

pub(super) fn check(artifact: &Artifact) -> Result<()> {
  check_name(&artifact.stack)?;
  for name in artifact.parameters.keys() {
    check_name(name)?;
  }

  check_conditions(artifact)?;
  check_resources(artifact)?;
  check_grants(artifact)?;
  for binding in artifact.schedules.values() {
    check_schedule(artifact, binding)?;
  }

  // must serialize, or the hash and every writer downstream fail later
  artifact
    .compute_hash()
    .map_err(|e| SynthError::Format(e.to_string()))?;
  Ok(())
}

fn integrity(message: String) -> SynthError {
  SynthError::GraphIntegrity(message)
}

fn check_conditions(artifact: &Artifact) -> Result<()> {
  let conditions = &artifact.conditions;
  conditions.check_defined()?;
  conditions.check_acyclic()?;

  for (id, expr) in conditions.iter() {
    check_name(id.as_str())?;
    for symbol in expr.parameter_refs() {
      match artifact.parameters.get(&symbol.name) {
        Some(decl) if decl.param_type == symbol.param_type => {}
        _ => return Err(SynthError::UnknownParameter(symbol.name.clone())),
      }
    }
  }
  Ok(())
}

fn check_resources(artifact: &Artifact) -> Result<()> {
  for (key, def) in &artifact.resources {
    if key != &def.id {
      return Err(integrity(format!("resource keyed '{key}' has id '{}'", def.id)));
    }
    check_name(def.id.as_str())?;

    if let Some(condition) = &def.condition
      && !artifact.conditions.contains(condition)
    {
      return Err(SynthError::UnknownCondition(condition.0.clone()));
    }

    for reference in def.attributes.references() {
      match reference {
        DeferredRef::Parameter(name) => {
          if !artifact.parameters.contains_key(name) {
            return Err(SynthError::UnknownParameter(name.clone()));
          }
        }
        DeferredRef::Resource { id, .. } => {
          let referenced = artifact
            .resources
            .get(id)
            .ok_or_else(|| integrity(format!("'{key}' references unknown resource '{id}'")))?;
          if !artifact
            .conditions
            .implies(def.condition.as_ref(), referenced.condition.as_ref())
          {
            return Err(integrity(format!(
              "'{key}' references '{id}', which is absent in some deployments where '{key}' exists"
            )));
          }
        }
      }
    }

    let indexed = match def.kind {
      ResourceKind::PermissionGrant => artifact.grants.contains_key(key),
      ResourceKind::Schedule => artifact.schedules.contains_key(key),
      ResourceKind::Storage | ResourceKind::Compute => true,
    };
    if !indexed {
      return Err(integrity(format!("{} resource '{key}' has no binding record", def.kind)));
    }
  }
  Ok(())
}

fn check_grants(artifact: &Artifact) -> Result<()> {
  for (key, grant) in &artifact.grants {
    if key != &grant.id {
      return Err(integrity(format!("grant keyed '{key}' has id '{}'", grant.id)));
    }

    let def = artifact
      .resources
      .get(key)
      .filter(|d| d.kind == ResourceKind::PermissionGrant)
      .ok_or_else(|| integrity(format!("grant '{key}' has no permission resource")))?;
    if def.condition != grant.condition {
      return Err(integrity(format!("grant '{key}' and its resource carry different conditions")));
    }

    for endpoint in [&grant.source, &grant.target] {
      let end = artifact
        .resources
        .get(endpoint)
        .ok_or_else(|| integrity(format!("grant '{key}' references '{endpoint}', which is not in the graph")))?;
      if !artifact
        .conditions
        .implies(grant.condition.as_ref(), end.condition.as_ref())
      {
        return Err(integrity(format!("grant '{key}' can exist without its endpoint '{endpoint}'")));
      }
    }
  }
  Ok(())
}

fn check_schedule(artifact: &Artifact, binding: &ScheduleBinding) -> Result<()> {
  let rule_id = &binding.rule;
  if binding.rate.value == 0 {
    return Err(SynthError::InvalidRate(rule_id.0.clone()));
  }
  if artifact.schedules.get(rule_id) != Some(binding) {
    return Err(integrity(format!("schedule binding for '{rule_id}' is keyed under another id")));
  }

  let rule = artifact
    .resources
    .get(rule_id)
    .filter(|d| d.kind == ResourceKind::Schedule)
    .ok_or_else(|| integrity(format!("schedule '{rule_id}' has no rule resource")))?;
  if rule.condition != binding.condition {
    return Err(integrity(format!("schedule '{rule_id}' and its rule carry different conditions")));
  }

  artifact
    .resources
    .get(&binding.target)
    .filter(|d| d.kind == ResourceKind::Compute)
    .ok_or_else(|| integrity(format!("schedule '{rule_id}' targets '{}', which is not compute", binding.target)))?;

  let permission = artifact
    .grants
    .get(&binding.permission)
    .ok_or_else(|| integrity(format!("schedule '{rule_id}' has no invoke permission")))?;
  if &permission.source != rule_id || permission.target != binding.target {
    return Err(integrity(format!(
      "permission '{}' does not connect '{rule_id}' to '{}'",
      permission.id, binding.target
    )));
  }
  if permission.condition != binding.condition {
    return Err(integrity(format!(
      "schedule '{rule_id}' and its permission '{}' carry different conditions",
      permission.id
    )));
  }
  Ok(())
}
