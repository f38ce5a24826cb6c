use condstack_lib::SynthError;
use condstack_lib::emit::emit;
use condstack_lib::graph::{Attributes, GraphBuilder, ResourceKind};
use condstack_lib::param::ParamType;
use condstack_lib::preview::{Bindings, instantiate};

const ENVS: [&str; 5] = ["prod", "dev", "qa", "staging", ""];

#[test]
fn grant_between_conditional_endpoints_exists_only_with_both() {
  let mut g = GraphBuilder::new("grants");
  let env = g.declare_parameter("env", ParamType::String, "").unwrap();
  let b = g.conditions();
  let c1_expr = b.not(b.equals(&env, "qa").unwrap());
  let c1 = g.define_condition("NotQa", c1_expr).unwrap();
  let c2_expr = g.conditions().not(g.conditions().equals(&env, "dev").unwrap());
  let c2 = g.define_condition("NotDev", c2_expr).unwrap();

  g.define("A", ResourceKind::Compute, Attributes::new(), Some(&c1)).unwrap();
  g.define("B", ResourceKind::Storage, Attributes::new(), Some(&c2)).unwrap();
  let grant = g.grant("A", "B", "s3:PutObject").unwrap();

  let artifact = emit(&g.finish().unwrap()).unwrap();
  let condition = grant.condition.unwrap();
  assert!(artifact.conditions().implies(Some(&condition), Some(c1.id())));
  assert!(artifact.conditions().implies(Some(&condition), Some(c2.id())));

  for env in ENVS {
    let preview = instantiate(&artifact, &Bindings::new().with("env", env)).unwrap();
    assert_eq!(
      preview.contains(grant.id.as_str()),
      preview.contains("A") && preview.contains("B"),
      "env={env}"
    );
  }
}

#[test]
fn grant_reuses_endpoint_condition_when_other_side_is_unconditional() {
  let mut g = GraphBuilder::new("grants");
  let env = g.declare_parameter("env", ParamType::String, "").unwrap();
  let expr = g.conditions().equals(&env, "prod").unwrap();
  let is_prod = g.define_condition("IsProd", expr).unwrap();

  g.define("fn", ResourceKind::Compute, Attributes::new(), None).unwrap();
  g.define("audit", ResourceKind::Storage, Attributes::new(), Some(&is_prod))
    .unwrap();

  let grant = g.grant("fn", "audit", "s3:PutObject").unwrap();
  assert_eq!(grant.condition.as_ref(), Some(is_prod.id()));

  let artifact = emit(&g.finish().unwrap()).unwrap();
  // no derived condition was needed
  assert_eq!(artifact.conditions().len(), 1);
}

#[test]
fn grant_to_missing_resource_aborts_synthesis() {
  let mut g = GraphBuilder::new("grants");
  g.define("fn", ResourceKind::Compute, Attributes::new(), None).unwrap();

  let err = g.grant("fn", "custom-bucket", "s3:PutObject").unwrap_err();
  assert!(matches!(err, SynthError::GraphIntegrity(_)));
}
