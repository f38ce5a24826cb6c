//! condstack-lib: conditional resource provisioning for a small cloud stack
//!
//! One stack definition produces different resource graphs depending on two
//! kinds of condition that are resolved at different times:
//! - deployment conditions: expressions over symbolic parameters, attached to
//!   resources and evaluated by the provisioning system at instantiation
//! - build conditions: predicates over the synthesis host, decided during
//!   synthesis, so only the chosen branch is ever constructed
//!
//! Synthesis declares `param`s, builds `condition`s, assembles a `graph`, and
//! `emit`s an immutable artifact. `preview` models a deployment of that
//! artifact for concrete parameter values.

pub mod condition;
pub mod config;
pub mod consts;
pub mod emit;
pub mod error;
pub mod graph;
pub mod param;
pub mod preview;
pub mod reference;
pub mod stack;
pub mod util;

pub use error::{Result, SynthError};
