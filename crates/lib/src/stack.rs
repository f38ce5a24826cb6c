//! The stack this repository deploys.
//!
//! A storage bucket, a compute function writing timestamped objects into it,
//! and a schedule that runs the function hourly in production and every five
//! minutes elsewhere. Both schedule branches are emitted, each guarded by its
//! deployment condition. One more bucket depends on who runs synthesis; that
//! choice is made here and only the chosen bucket reaches the artifact.
//!
//! The function reads its environment label at runtime from `ENV_NAME`, which
//! is bound to the deferred `env` parameter. Nothing from the synthesis host's
//! environment is written into the function body.

use tracing::info;

use crate::condition::{BuildArm, BuildConditions, HostProbe};
use crate::config::SynthConfig;
use crate::consts::{DEFAULT_BRANCH, STORAGE_WRITE_ACTION};
use crate::emit::{Artifact, emit};
use crate::error::Result;
use crate::graph::{AttrValue, Attributes, Graph, GraphBuilder, ResourceKind};
use crate::param::ParamType;
use crate::reference::DeferredRef;

pub const BUCKET_ID: &str = "custom-bucket";
pub const FUNCTION_ID: &str = "AddFileLambda";
pub const PROD_CONDITION: &str = "IsProd";
pub const DEV_CONDITION: &str = "IsDev";
pub const PROD_SCHEDULE_ID: &str = "ScheduleRuleProd";
pub const DEV_SCHEDULE_ID: &str = "ScheduleRuleDev";

const RUNTIME: &str = "nodejs18.x";
const HANDLER: &str = "index.handler";

/// Inline handler. `$${...}` is left for the provisioning system; the single
/// `${...}` forms are the handler's own runtime interpolation.
const HANDLER_CODE: &str = r#"const AWS = require('aws-sdk');
const s3 = new AWS.S3();

exports.handler = async () => {
  const params = {
    Bucket: '$${resource:custom-bucket:name}',
    Key: `file-${Date.now()}.txt`,
    Body: `Hello from Lambda! (env: ${process.env.ENV_NAME})`,
  };

  await s3.putObject(params).promise();
};
"#;

/// Synthesize the stack and emit its artifact.
///
/// # Errors
///
/// Any synthesis error; no artifact is produced in that case.
pub fn synthesize(config: &SynthConfig, probe: impl HostProbe) -> Result<Artifact> {
  let host = BuildConditions::new(probe);
  let graph = build_graph(config, &host)?;
  emit(&graph)
}

/// Assemble the stack's resource graph.
///
/// # Errors
///
/// `InvalidConfig` for a configuration that some host would reject, before
/// anything is probed; then any graph construction error.
pub fn build_graph<P: HostProbe>(config: &SynthConfig, host: &BuildConditions<P>) -> Result<Graph> {
  config.validate()?;
  let mut g = GraphBuilder::new(&config.stack_name);

  let env = g.declare_parameter(&config.parameter.name, ParamType::String, &config.parameter.description)?;

  let is_prod_expr = g.conditions().equals(&env, config.prod_value.as_str())?;
  let is_prod = g.define_condition(PROD_CONDITION, is_prod_expr)?;
  let is_dev_expr = g.conditions().not(&is_prod);
  let is_dev = g.define_condition(DEV_CONDITION, is_dev_expr)?;

  g.define(BUCKET_ID, ResourceKind::Storage, Attributes::new(), None)?;

  let environment = Attributes::new()
    .with("BUCKET_NAME", DeferredRef::resource(BUCKET_ID, "name"))
    .with("ENV_NAME", env.reference());
  let function = Attributes::new()
    .with("runtime", RUNTIME)
    .with("handler", HANDLER)
    .with("code", AttrValue::template(HANDLER_CODE)?)
    .with("environment", environment);
  g.define(FUNCTION_ID, ResourceKind::Compute, function, None)?;

  g.grant(FUNCTION_ID, BUCKET_ID, STORAGE_WRITE_ACTION)?;

  g.schedule(PROD_SCHEDULE_ID, FUNCTION_ID, config.schedules.prod, Some(&is_prod))?;
  g.schedule(DEV_SCHEDULE_ID, FUNCTION_ID, config.schedules.dev, Some(&is_dev))?;

  let bucket = branch_bucket_id(config, host);
  g.define(&bucket, ResourceKind::Storage, Attributes::new(), None)?;

  let graph = g.finish()?;
  info!(stack = graph.name(), branch_bucket = %bucket, "synthesized stack");
  Ok(graph)
}

/// Id of the host-selected bucket: `<prefix><identity>` when the host matches
/// the configured identity, else `<prefix>other`.
pub fn branch_bucket_id<P: HostProbe>(config: &SynthConfig, host: &BuildConditions<P>) -> String {
  let identity = config.host.identity.as_str();
  let arms = [BuildArm::identity_is(identity, identity)];
  let branch = host.select(&arms, DEFAULT_BRANCH);
  format!("{}{}", config.host.prefix, branch)
}
