//! Resource graph: typed resource definitions, schedule bindings and the
//! permission grants derived between them.

mod builder;
mod permission;
mod types;

pub use builder::{Graph, GraphBuilder};
pub use types::{
  AttrValue, Attributes, PermissionGrant, Rate, RateUnit, ResourceDefinition, ResourceId, ResourceKind,
  ScheduleBinding,
};
