use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use super::expr::{BoolExpr, ConditionId};
use crate::error::{Result, SynthError};

/// Named deployment conditions, keyed by logical name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionSet(BTreeMap<ConditionId, BoolExpr>);

impl ConditionSet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, id: &ConditionId) -> Option<&BoolExpr> {
    self.0.get(id)
  }

  pub fn contains(&self, id: &ConditionId) -> bool {
    self.0.contains_key(id)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&ConditionId, &BoolExpr)> {
    self.0.iter()
  }

  /// Register a named condition.
  ///
  /// Re-inserting an identical expression under the same name is a no-op.
  /// References to names not yet defined are allowed here and checked by
  /// [`ConditionSet::check_defined`].
  ///
  /// # Errors
  ///
  /// `DuplicateCondition` if the name is taken by a different expression,
  /// `CyclicExpression` if the new definition closes a reference cycle.
  pub(crate) fn insert(&mut self, id: ConditionId, expr: BoolExpr) -> Result<()> {
    if let Some(existing) = self.0.get(&id) {
      if existing == &expr {
        return Ok(());
      }
      return Err(SynthError::DuplicateCondition(id.0));
    }

    self.0.insert(id.clone(), expr);
    if let Err(e) = self.check_acyclic() {
      self.0.remove(&id);
      return Err(e);
    }
    Ok(())
  }

  /// Every `Condition(..)` reference must name a defined condition.
  pub fn check_defined(&self) -> Result<()> {
    for expr in self.0.values() {
      for referenced in expr.condition_refs() {
        if !self.0.contains_key(referenced) {
          return Err(SynthError::UnknownCondition(referenced.0.clone()));
        }
      }
    }
    Ok(())
  }

  /// Named references must not form a cycle.
  ///
  /// Undefined names are skipped; they have no outgoing edges.
  pub fn check_acyclic(&self) -> Result<()> {
    let mut graph: DiGraph<&ConditionId, ()> = DiGraph::new();
    let mut nodes: HashMap<&ConditionId, NodeIndex> = HashMap::new();

    for id in self.0.keys() {
      nodes.insert(id, graph.add_node(id));
    }

    for (id, expr) in &self.0 {
      let from = nodes[id];
      for referenced in expr.condition_refs() {
        if referenced == id {
          return Err(SynthError::CyclicExpression(id.0.clone()));
        }
        if let Some(&to) = nodes.get(referenced) {
          graph.add_edge(from, to, ());
        }
      }
    }

    toposort(&graph, None)
      .map(|_| ())
      .map_err(|cycle| SynthError::CyclicExpression(graph[cycle.node_id()].0.clone()))
  }

  /// Names whose truth is implied by `id` being true.
  ///
  /// Always contains `id` itself, and follows aliases (`Condition(x)`) and
  /// conjunctions of references. Used as a conservative, syntactic implication
  /// test: `a` implies `b` if every conjunct of `b` is a conjunct of `a`.
  pub fn conjuncts(&self, id: &ConditionId) -> BTreeSet<ConditionId> {
    let mut out = BTreeSet::new();
    self.collect_conjuncts(id, &mut out);
    out
  }

  fn collect_conjuncts(&self, id: &ConditionId, out: &mut BTreeSet<ConditionId>) {
    if !out.insert(id.clone()) {
      return;
    }
    if let Some(expr) = self.0.get(id) {
      self.collect_expr_conjuncts(expr, out);
    }
  }

  fn collect_expr_conjuncts(&self, expr: &BoolExpr, out: &mut BTreeSet<ConditionId>) {
    match expr {
      BoolExpr::Condition(id) => self.collect_conjuncts(id, out),
      BoolExpr::And(l, r) => {
        self.collect_expr_conjuncts(l, out);
        self.collect_expr_conjuncts(r, out);
      }
      BoolExpr::Equals { .. } | BoolExpr::Not(_) | BoolExpr::Or(_, _) => {}
    }
  }

  /// Whether condition `a` (absent = always) implies condition `b`.
  pub fn implies(&self, a: Option<&ConditionId>, b: Option<&ConditionId>) -> bool {
    match (a, b) {
      (_, None) => true,
      (None, Some(_)) => false,
      (Some(a), Some(b)) => self.conjuncts(b).is_subset(&self.conjuncts(a)),
    }
  }
}
