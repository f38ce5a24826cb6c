use condstack_lib::condition::DeploymentCondition;
use condstack_lib::emit::{Artifact, emit};
use condstack_lib::graph::{Attributes, GraphBuilder, Rate, ResourceId, ResourceKind};
use condstack_lib::param::ParamType;
use condstack_lib::preview::{Bindings, instantiate};

/// `env`, `isProd = env == "prod"`, `isDev = !isProd`, one function, and a
/// schedule per branch.
fn prod_dev_schedules() -> Artifact {
  let mut g = GraphBuilder::new("schedules");
  let env = g.declare_parameter("env", ParamType::String, "").unwrap();

  let expr = g.conditions().equals(&env, "prod").unwrap();
  let is_prod: DeploymentCondition = g.define_condition("isProd", expr).unwrap();
  let expr = g.conditions().not(&is_prod);
  let is_dev = g.define_condition("isDev", expr).unwrap();

  g.define("fn", ResourceKind::Compute, Attributes::new(), None).unwrap();
  g.schedule("ProdRule", "fn", Rate::minutes(60), Some(&is_prod)).unwrap();
  g.schedule("DevRule", "fn", Rate::minutes(5), Some(&is_dev)).unwrap();

  emit(&g.finish().unwrap()).unwrap()
}

#[test]
fn both_branches_are_emitted_with_paired_conditions() {
  let artifact = prod_dev_schedules();

  assert_eq!(artifact.count(ResourceKind::Schedule), 2);
  assert_eq!(artifact.count(ResourceKind::PermissionGrant), 2);
  assert_eq!(artifact.grants().len(), 2);

  let mut conditions = Vec::new();
  for binding in artifact.schedules().values() {
    let rule = &artifact.resources()[&binding.rule];
    let grant = &artifact.grants()[&binding.permission];
    assert_eq!(rule.condition, binding.condition);
    assert_eq!(grant.condition, binding.condition);
    assert_eq!(grant.source, binding.rule);
    conditions.push(binding.condition.clone().unwrap());
  }

  assert_eq!(conditions.len(), 2);
  assert_ne!(conditions[0], conditions[1]);
}

#[test]
fn rates_are_independent_per_branch() {
  let artifact = prod_dev_schedules();
  let prod = &artifact.schedules()[&ResourceId::new("ProdRule")];
  let dev = &artifact.schedules()[&ResourceId::new("DevRule")];

  assert_eq!(prod.rate, Rate::minutes(60));
  assert_eq!(dev.rate, Rate::minutes(5));
  assert_eq!(prod.condition.as_ref().unwrap().as_str(), "isProd");
  assert_eq!(dev.condition.as_ref().unwrap().as_str(), "isDev");
}

#[test]
fn each_deployment_gets_exactly_one_rule_and_its_permission() {
  let artifact = prod_dev_schedules();

  for env in ["prod", "dev", "staging", ""] {
    let preview = instantiate(&artifact, &Bindings::new().with("env", env)).unwrap();
    assert_eq!(preview.count(ResourceKind::Schedule), 1, "env={env}");
    assert_eq!(preview.count(ResourceKind::PermissionGrant), 1, "env={env}");

    let (rule, permission) = if env == "prod" {
      ("ProdRule", "ProdRuleLambdaPerms")
    } else {
      ("DevRule", "DevRuleLambdaPerms")
    };
    assert!(preview.contains(rule));
    assert!(preview.contains(permission));
  }
}
