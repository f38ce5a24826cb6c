//! The synthesis artifact.
//!
//! [`emit`] turns a finished [`Graph`] into an [`Artifact`]: the complete,
//! serializable resource graph handed to the provisioning system. Every
//! deployment-conditional branch is present, each resource naming its
//! condition; build-time branches that weren't selected are absent.
//!
//! Before returning, the artifact is re-checked against the graph invariants.
//! An `Artifact` value therefore always satisfies them, including one loaded
//! with [`Artifact::from_json`].
//!
//! # Example
//!
//! ```json
//! {
//!   "stack": "custom-cdk-stack",
//!   "parameters": { "env": { "type": "String", "description": "..." } },
//!   "conditions": {
//!     "IsDev": { "not": { "condition": "IsProd" } },
//!     "IsProd": { "equals": { "param": { "name": "env", "type": "String" }, "value": "prod" } }
//!   },
//!   "resources": {
//!     "ScheduleRuleDev": { "id": "ScheduleRuleDev", "kind": "schedule", "condition": "IsDev", ... }
//!   },
//!   "grants": { ... },
//!   "schedules": { ... }
//! }
//! ```

mod validate;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::condition::ConditionSet;
use crate::error::{Result, SynthError};
use crate::graph::{Graph, PermissionGrant, ResourceDefinition, ResourceId, ResourceKind, ScheduleBinding};
use crate::param::ParameterDecl;
use crate::util::hash::Hashable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Artifact {
  stack: String,
  #[serde(default)]
  parameters: BTreeMap<String, ParameterDecl>,
  #[serde(default)]
  conditions: ConditionSet,
  resources: BTreeMap<ResourceId, ResourceDefinition>,
  #[serde(default)]
  grants: BTreeMap<ResourceId, PermissionGrant>,
  #[serde(default)]
  schedules: BTreeMap<ResourceId, ScheduleBinding>,
}

impl Hashable for Artifact {}

/// Serialize a finished graph.
///
/// # Errors
///
/// Whatever invariant of the graph fails its final check. No artifact is
/// returned in that case.
pub fn emit(graph: &Graph) -> Result<Artifact> {
  let artifact = Artifact {
    stack: graph.name().to_string(),
    parameters: graph.parameters().decls(),
    conditions: graph.conditions().clone(),
    resources: graph.resources().clone(),
    grants: graph.grants().clone(),
    schedules: graph.schedules().clone(),
  };

  validate::check(&artifact)?;

  info!(
    stack = %artifact.stack,
    parameters = artifact.parameters.len(),
    conditions = artifact.conditions.len(),
    resources = artifact.resources.len(),
    "emitted artifact"
  );
  Ok(artifact)
}

impl Artifact {
  pub fn stack(&self) -> &str {
    &self.stack
  }

  pub fn parameters(&self) -> &BTreeMap<String, ParameterDecl> {
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

  pub fn resource(&self, id: &str) -> Option<&ResourceDefinition> {
    self.resources.get(&ResourceId::new(id))
  }

  pub fn count(&self, kind: ResourceKind) -> usize {
    self.resources.values().filter(|r| r.kind == kind).count()
  }

  /// Parse and re-validate a previously emitted artifact.
  pub fn from_json(text: &str) -> Result<Self> {
    let artifact: Artifact = serde_json::from_str(text).map_err(|e| SynthError::Format(e.to_string()))?;
    validate::check(&artifact)?;
    Ok(artifact)
  }

  /// YAML goes through the JSON value model, so enum variants appear as
  /// plain single-key maps rather than YAML tags.
  pub fn from_yaml(text: &str) -> Result<Self> {
    let value: serde_json::Value = serde_yaml::from_str(text).map_err(|e| SynthError::Format(e.to_string()))?;
    let artifact: Artifact = serde_json::from_value(value).map_err(|e| SynthError::Format(e.to_string()))?;
    validate::check(&artifact)?;
    Ok(artifact)
  }

  pub fn render(&self, format: ArtifactFormat) -> Result<String> {
    let value = serde_json::to_value(self).map_err(|e| SynthError::Format(e.to_string()))?;
    match format {
      ArtifactFormat::Json => serde_json::to_string_pretty(&value).map_err(|e| SynthError::Format(e.to_string())),
      ArtifactFormat::Yaml => serde_yaml::to_string(&value).map_err(|e| SynthError::Format(e.to_string())),
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
  #[default]
  Json,
  Yaml,
}

impl ArtifactFormat {
  pub const fn extension(&self) -> &'static str {
    match self {
      ArtifactFormat::Json => "json",
      ArtifactFormat::Yaml => "yaml",
    }
  }

  /// Guess the format from a file name, defaulting to JSON.
  pub fn from_path(path: &std::path::Path) -> Self {
    match path.extension().and_then(|e| e.to_str()) {
      Some("yaml") | Some("yml") => ArtifactFormat::Yaml,
      _ => ArtifactFormat::Json,
    }
  }

  pub fn parse(&self, text: &str) -> Result<Artifact> {
    match self {
      ArtifactFormat::Json => Artifact::from_json(text),
      ArtifactFormat::Yaml => Artifact::from_yaml(text),
    }
  }
}
