use condstack_lib::condition::{BuildArm, BuildConditions, FixedProbe};
use condstack_lib::config::SynthConfig;
use condstack_lib::emit::emit;
use condstack_lib::graph::{Attributes, GraphBuilder, ResourceKind};
use condstack_lib::stack::synthesize;

fn alice_config() -> SynthConfig {
  let mut config = SynthConfig::default();
  config.host.identity = "alice".to_string();
  config.host.prefix = "bucket-".to_string();
  config
}

fn branch_buckets(probe: FixedProbe) -> Vec<String> {
  let artifact = synthesize(&alice_config(), probe).unwrap();
  ["bucket-alice", "bucket-other"]
    .into_iter()
    .filter(|id| artifact.resource(id).is_some())
    .map(str::to_string)
    .collect()
}

#[test]
fn alice_gets_only_her_bucket() {
  assert_eq!(branch_buckets(FixedProbe::named("alice")), vec!["bucket-alice"]);
}

#[test]
fn anyone_else_gets_only_the_other_bucket() {
  for name in ["bob", "Alice", "alice ", "root"] {
    assert_eq!(branch_buckets(FixedProbe::named(name)), vec!["bucket-other"], "identity {name:?}");
  }
}

#[test]
fn unknown_host_takes_default_branch() {
  assert_eq!(branch_buckets(FixedProbe::unknown()), vec!["bucket-other"]);
}

#[test]
fn unselected_branch_is_never_constructed() {
  let host = BuildConditions::new(FixedProbe::named("bob"));
  let mut g = GraphBuilder::new("branches");

  let arms = [
    BuildArm::identity_is("alice", "alice"),
    BuildArm::identity_is("bob", "bob"),
  ];
  match host.select(&arms, "other") {
    "alice" => {
      g.define("alice-only", ResourceKind::Storage, Attributes::new(), None)
        .unwrap();
    }
    "bob" => {
      g.define("bob-only", ResourceKind::Storage, Attributes::new(), None)
        .unwrap();
      g.define("bob-fn", ResourceKind::Compute, Attributes::new(), None)
        .unwrap();
    }
    _ => {
      g.define("fallback", ResourceKind::Storage, Attributes::new(), None)
        .unwrap();
    }
  }

  let artifact = emit(&g.finish().unwrap()).unwrap();
  let ids: Vec<_> = artifact.resources().keys().map(|id| id.as_str()).collect();
  assert_eq!(ids, vec!["bob-fn", "bob-only"]);
  // build decisions carry no deployment condition
  assert!(artifact.conditions().is_empty());
}
