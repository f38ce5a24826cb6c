use condstack_lib::condition::FixedProbe;
use condstack_lib::config::SynthConfig;
use condstack_lib::emit::{Artifact, ArtifactFormat};
use condstack_lib::graph::{AttrValue, ResourceKind};
use condstack_lib::preview::{Bindings, instantiate};
use condstack_lib::stack::{BUCKET_ID, DEV_SCHEDULE_ID, FUNCTION_ID, PROD_SCHEDULE_ID, synthesize};
use condstack_lib::util::hash::Hashable;

fn artifact(identity: &str) -> Artifact {
  synthesize(&SynthConfig::default(), FixedProbe::named(identity)).unwrap()
}

#[test]
fn stack_shape() {
  let artifact = artifact("carol");

  assert_eq!(artifact.stack(), "custom-cdk-stack");
  assert_eq!(artifact.parameters().len(), 1);
  assert_eq!(artifact.conditions().len(), 2);
  assert_eq!(artifact.count(ResourceKind::Storage), 2);
  assert_eq!(artifact.count(ResourceKind::Compute), 1);
  assert_eq!(artifact.count(ResourceKind::Schedule), 2);
  assert_eq!(artifact.count(ResourceKind::PermissionGrant), 3);

  // storage and compute are present in every deployment
  for id in [BUCKET_ID, FUNCTION_ID, "bucket-user-other"] {
    assert!(artifact.resource(id).unwrap().condition.is_none(), "{id}");
  }
}

#[test]
fn synthesis_is_idempotent() {
  let first = artifact("alice");
  let second = artifact("alice");
  assert_eq!(first, second);
  assert_eq!(first.compute_hash().unwrap(), second.compute_hash().unwrap());
}

#[test]
fn hosts_in_the_same_branch_synthesize_the_same_artifact() {
  assert_eq!(
    artifact("bob").compute_hash().unwrap(),
    artifact("carol").compute_hash().unwrap()
  );
}

#[test]
fn emitted_artifact_survives_a_round_trip() {
  let artifact = artifact("bob");
  for format in [ArtifactFormat::Json, ArtifactFormat::Yaml] {
    let text = artifact.render(format).unwrap();
    assert_eq!(format.parse(&text).unwrap(), artifact);
  }
}

#[test]
fn deployments_differ_only_in_schedule_branch() {
  let artifact = artifact("bob");

  let prod = instantiate(&artifact, &Bindings::new().with("env", "prod")).unwrap();
  let dev = instantiate(&artifact, &Bindings::new().with("env", "dev")).unwrap();

  assert!(prod.contains(PROD_SCHEDULE_ID) && !prod.contains(DEV_SCHEDULE_ID));
  assert!(dev.contains(DEV_SCHEDULE_ID) && !dev.contains(PROD_SCHEDULE_ID));
  for id in [BUCKET_ID, FUNCTION_ID, "bucket-user-other", "AddFileLambda-custom-bucket-grant"] {
    assert!(prod.contains(id) && dev.contains(id), "{id}");
  }
}

#[test]
fn function_sees_deployment_value_not_host_value() {
  let artifact = artifact("bob");
  let preview = instantiate(&artifact, &Bindings::new().with("env", "prod")).unwrap();

  let function = &preview.resources[&condstack_lib::graph::ResourceId::new(FUNCTION_ID)];
  let Some(AttrValue::Map(env)) = function.attributes.get("environment") else {
    panic!("environment should be a map");
  };
  assert_eq!(env.get("ENV_NAME"), Some(&AttrValue::from("prod")));
  assert_eq!(env.get("BUCKET_NAME"), Some(&AttrValue::from("<custom-bucket>")));

  let Some(AttrValue::String(code)) = function.attributes.get("code") else {
    panic!("code should resolve to a string");
  };
  assert!(code.contains("Bucket: '<custom-bucket>'"));
  assert!(code.contains("${process.env.ENV_NAME}"));
}

#[test]
fn tampered_artifact_is_rejected_on_load() {
  let artifact = artifact("bob");
  let mut value = serde_json::to_value(&artifact).unwrap();
  value["resources"]
    .as_object_mut()
    .unwrap()
    .remove(FUNCTION_ID);

  assert!(Artifact::from_json(&value.to_string()).is_err());
}
