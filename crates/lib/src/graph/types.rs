use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::condition::ConditionId;
use crate::reference::{DeferredRef, ReferenceError, Template};

/// Logical id of a resource, unique within a graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub String);

impl ResourceId {
  pub fn new(id: impl Into<String>) -> Self {
    ResourceId(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ResourceId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for ResourceId {
  fn from(value: &str) -> Self {
    ResourceId::new(value)
  }
}

/// Provisioned capability a resource stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
  Storage,
  Compute,
  Schedule,
  PermissionGrant,
}

impl ResourceKind {
  pub const fn as_str(&self) -> &'static str {
    match self {
      ResourceKind::Storage => "storage",
      ResourceKind::Compute => "compute",
      ResourceKind::Schedule => "schedule",
      ResourceKind::PermissionGrant => "permission_grant",
    }
  }
}

impl fmt::Display for ResourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A resource attribute value.
///
/// Values that embed another resource's identity, or a deployment parameter,
/// can only be expressed as [`AttrValue::Ref`] or [`AttrValue::Template`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrValue {
  String(String),
  Number(i64),
  Bool(bool),
  Ref(DeferredRef),
  Template(Template),
  List(Vec<AttrValue>),
  Map(BTreeMap<String, AttrValue>),
}

impl AttrValue {
  /// Parse text with `$${...}` placeholders.
  pub fn template(text: &str) -> Result<Self, ReferenceError> {
    Template::parse(text).map(AttrValue::Template)
  }

  /// Deferred references anywhere inside this value.
  pub fn references(&self) -> Vec<&DeferredRef> {
    let mut out = Vec::new();
    self.collect_refs(&mut out);
    out
  }

  fn collect_refs<'a>(&'a self, out: &mut Vec<&'a DeferredRef>) {
    match self {
      AttrValue::Ref(r) => out.push(r),
      AttrValue::Template(t) => out.extend(t.references()),
      AttrValue::List(items) => items.iter().for_each(|v| v.collect_refs(out)),
      AttrValue::Map(map) => map.values().for_each(|v| v.collect_refs(out)),
      AttrValue::String(_) | AttrValue::Number(_) | AttrValue::Bool(_) => {}
    }
  }
}

impl From<&str> for AttrValue {
  fn from(value: &str) -> Self {
    AttrValue::String(value.to_string())
  }
}

impl From<String> for AttrValue {
  fn from(value: String) -> Self {
    AttrValue::String(value)
  }
}

impl From<i64> for AttrValue {
  fn from(value: i64) -> Self {
    AttrValue::Number(value)
  }
}

impl From<bool> for AttrValue {
  fn from(value: bool) -> Self {
    AttrValue::Bool(value)
  }
}

impl From<DeferredRef> for AttrValue {
  fn from(value: DeferredRef) -> Self {
    AttrValue::Ref(value)
  }
}

impl From<Template> for AttrValue {
  fn from(value: Template) -> Self {
    AttrValue::Template(value)
  }
}

impl From<Attributes> for AttrValue {
  fn from(value: Attributes) -> Self {
    AttrValue::Map(value.0)
  }
}

impl From<Vec<AttrValue>> for AttrValue {
  fn from(value: Vec<AttrValue>) -> Self {
    AttrValue::List(value)
  }
}

/// Ordered attribute map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, AttrValue>);

impl Attributes {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
    self.0.insert(key.to_string(), value.into());
    self
  }

  pub fn get(&self, key: &str) -> Option<&AttrValue> {
    self.0.get(key)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
    self.0.iter()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn references(&self) -> Vec<&DeferredRef> {
    self.0.values().flat_map(|v| v.references()).collect()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDefinition {
  pub id: ResourceId,
  pub kind: ResourceKind,
  #[serde(default, skip_serializing_if = "Attributes::is_empty")]
  pub attributes: Attributes,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub condition: Option<ConditionId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateUnit {
  Minutes,
  Hours,
  Days,
}

/// Fixed-rate schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rate {
  pub value: u32,
  pub unit: RateUnit,
}

impl Rate {
  pub const fn minutes(value: u32) -> Self {
    Self {
      value,
      unit: RateUnit::Minutes,
    }
  }

  pub const fn hours(value: u32) -> Self {
    Self {
      value,
      unit: RateUnit::Hours,
    }
  }

  pub const fn days(value: u32) -> Self {
    Self {
      value,
      unit: RateUnit::Days,
    }
  }
}

impl fmt::Display for Rate {
  /// Schedule expression, e.g. `rate(5 minutes)` or `rate(1 hour)`.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let unit = match (self.unit, self.value == 1) {
      (RateUnit::Minutes, true) => "minute",
      (RateUnit::Minutes, false) => "minutes",
      (RateUnit::Hours, true) => "hour",
      (RateUnit::Hours, false) => "hours",
      (RateUnit::Days, true) => "day",
      (RateUnit::Days, false) => "days",
    };
    write!(f, "rate({} {})", self.value, unit)
  }
}

/// Access edge between two resources.
///
/// `id` names the permission resource that realizes the grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
  pub id: ResourceId,
  pub source: ResourceId,
  pub target: ResourceId,
  pub action: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub principal: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub condition: Option<ConditionId>,
}

/// Schedule rule bound to a compute target, plus the permission letting it invoke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleBinding {
  pub rule: ResourceId,
  pub target: ResourceId,
  pub permission: ResourceId,
  pub rate: Rate,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub condition: Option<ConditionId>,
}
