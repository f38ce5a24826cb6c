//! The two condition tiers.
//!
//! - Deployment conditions ([`BoolExpr`], [`DeploymentCondition`]) are
//!   expression trees over symbolic parameters. Synthesis attaches them to
//!   resources and emits every guarded branch; the provisioning system decides
//!   which branch exists at instantiation.
//! - Build conditions ([`BuildConditions`]) are predicates over the synthesis
//!   host, decided immediately. Only the selected branch is ever constructed.
//!
//! They are deliberately different types: a build decision is a `bool` that
//! gates Rust control flow, a deployment condition is data that cannot.

pub mod build;
pub mod builder;
mod expr;
mod set;

pub use build::{BuildArm, BuildConditions, EnvProbe, FixedProbe, HostProbe, HostState};
pub use builder::ConditionBuilder;
pub use expr::{BoolExpr, ConditionId, DeploymentCondition};
pub use set::ConditionSet;
