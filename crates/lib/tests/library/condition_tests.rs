use std::collections::BTreeMap;

use proptest::prelude::*;

use condstack_lib::SynthError;
use condstack_lib::condition::{BoolExpr, ConditionBuilder, ConditionSet};
use condstack_lib::emit::emit;
use condstack_lib::graph::GraphBuilder;
use condstack_lib::param::{Literal, ParamType, Parameter, Parameters};
use condstack_lib::preview::{Bindings, evaluate, instantiate};

/// Shape of an expression, built twice through the builder.
#[derive(Debug, Clone)]
enum Shape {
  Equals(&'static str),
  Not(Box<Shape>),
  And(Box<Shape>, Box<Shape>),
  Or(Box<Shape>, Box<Shape>),
}

const VALUES: [&str; 4] = ["prod", "dev", "staging", "qa"];

fn shape() -> impl Strategy<Value = Shape> {
  let leaf = prop::sample::select(VALUES.to_vec()).prop_map(Shape::Equals);
  leaf.prop_recursive(5, 48, 2, |inner| {
    prop_oneof![
      inner.clone().prop_map(|s| Shape::Not(Box::new(s))),
      (inner.clone(), inner.clone()).prop_map(|(l, r)| Shape::And(Box::new(l), Box::new(r))),
      (inner.clone(), inner).prop_map(|(l, r)| Shape::Or(Box::new(l), Box::new(r))),
    ]
  })
}

fn build(b: &ConditionBuilder<'_>, env: &Parameter, shape: &Shape) -> BoolExpr {
  match shape {
    Shape::Equals(value) => b.equals(env, *value).unwrap(),
    Shape::Not(inner) => b.not(build(b, env, inner)),
    Shape::And(l, r) => b.and(build(b, env, l), build(b, env, r)),
    Shape::Or(l, r) => b.or(build(b, env, l), build(b, env, r)),
  }
}

fn env_values(value: &str) -> BTreeMap<String, Literal> {
  BTreeMap::from([("env".to_string(), Literal::from(value))])
}

proptest! {
  #[test]
  fn structurally_equal_expressions_evaluate_identically(shape in shape(), value in prop::sample::select(VALUES.to_vec())) {
    let mut params = Parameters::new();
    let env = params.declare("env", ParamType::String, "").unwrap();
    let b = ConditionBuilder::new(&params);

    let first = build(&b, &env, &shape);
    let second = build(&b, &env, &shape);

    let empty = ConditionSet::new();
    let values = env_values(value);
    prop_assert_eq!(
      evaluate(&first, &empty, &values).unwrap(),
      evaluate(&second, &empty, &values).unwrap()
    );
  }

  #[test]
  fn equal_conditions_under_different_names_agree_after_emission(shape in shape()) {
    let mut g = GraphBuilder::new("equality");
    let env = g.declare_parameter("env", ParamType::String, "").unwrap();
    let first = build(&g.conditions(), &env, &shape);
    let second = build(&g.conditions(), &env, &shape);
    g.define_condition("First", first).unwrap();
    g.define_condition("Second", second).unwrap();
    let artifact = emit(&g.finish().unwrap()).unwrap();

    for value in VALUES {
      let preview = instantiate(&artifact, &Bindings::new().with("env", value)).unwrap();
      let holds: Vec<bool> = preview.conditions.values().copied().collect();
      prop_assert_eq!(holds[0], holds[1]);
    }
  }
}

#[test]
fn conditions_are_not_evaluated_during_synthesis() {
  let mut g = GraphBuilder::new("deferred");
  let env = g.declare_parameter("env", ParamType::String, "").unwrap();
  let expr = g.conditions().equals(&env, "prod").unwrap();
  let is_prod = g.define_condition("IsProd", expr).unwrap();

  // the condition is data over a symbol; the parameter still has no value
  assert!(matches!(is_prod.expr(), BoolExpr::Equals { param, .. } if param.name == "env"));
  assert_eq!(
    env.resolved_value(),
    Err(SynthError::PrematureResolution("env".to_string()))
  );
}

#[test]
fn condition_over_foreign_parameter_aborts() {
  let mut other = Parameters::new();
  let stage = other.declare("stage", ParamType::String, "").unwrap();

  let mut g = GraphBuilder::new("foreign");
  g.declare_parameter("env", ParamType::String, "").unwrap();
  assert_eq!(
    g.conditions().equals(&stage, "prod"),
    Err(SynthError::UnknownParameter("stage".to_string()))
  );

  // an expression built elsewhere is rejected when registered
  let foreign = ConditionBuilder::new(&other).equals(&stage, "prod").unwrap();
  assert_eq!(
    g.define_condition("IsProd", foreign),
    Err(SynthError::UnknownParameter("stage".to_string()))
  );
}

#[test]
fn cyclic_named_conditions_abort() {
  let mut g = GraphBuilder::new("cycle");
  let env = g.declare_parameter("env", ParamType::String, "").unwrap();

  let a = g.conditions().and(g.conditions().named("B").unwrap(), g.conditions().equals(&env, "x").unwrap());
  g.define_condition("A", a).unwrap();
  let b = g.conditions().not(g.conditions().named("A").unwrap());
  assert!(matches!(g.define_condition("B", b), Err(SynthError::CyclicExpression(_))));
}
