//! Build-time conditions, decided on the synthesis host.
//!
//! Host state is probed once, on first use, and cached for the rest of the
//! pass. A build decision selects exactly one branch; the others are never
//! constructed, so they leave nothing in the artifact.

use std::cell::OnceCell;

use tracing::{debug, warn};

use crate::consts::DEFAULT_HOST_VAR;

/// Reads the synthesis host's identity.
pub trait HostProbe {
  /// `None` when the identity can't be determined.
  fn identity(&self) -> Option<String>;
}

/// Reads an environment variable, falling back to the OS account name.
#[derive(Debug, Clone)]
pub struct EnvProbe {
  var: String,
}

impl EnvProbe {
  pub fn new(var: impl Into<String>) -> Self {
    Self { var: var.into() }
  }

  pub fn var(&self) -> &str {
    &self.var
  }
}

impl Default for EnvProbe {
  fn default() -> Self {
    Self::new(DEFAULT_HOST_VAR)
  }
}

impl HostProbe for EnvProbe {
  fn identity(&self) -> Option<String> {
    match std::env::var(&self.var) {
      Ok(value) if !value.is_empty() => Some(value),
      _ => whoami::fallible::username().ok().filter(|name| !name.is_empty()),
    }
  }
}

/// Fixed identity, for tests and for pinning synthesis to a known host.
#[derive(Debug, Clone, Default)]
pub struct FixedProbe(pub Option<String>);

impl FixedProbe {
  pub fn named(name: &str) -> Self {
    FixedProbe(Some(name.to_string()))
  }

  pub fn unknown() -> Self {
    FixedProbe(None)
  }
}

impl HostProbe for FixedProbe {
  fn identity(&self) -> Option<String> {
    self.0.clone()
  }
}

impl<P: HostProbe + ?Sized> HostProbe for &P {
  fn identity(&self) -> Option<String> {
    (**self).identity()
  }
}

/// Snapshot of synthesis-host state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostState {
  identity: Option<String>,
}

impl HostState {
  pub fn new(identity: Option<String>) -> Self {
    Self { identity }
  }

  pub fn identity(&self) -> Option<&str> {
    self.identity.as_deref()
  }

  /// `false` for unknown identity.
  pub fn identity_is(&self, name: &str) -> bool {
    self.identity() == Some(name)
  }
}

/// One arm of a build-time selection.
pub struct BuildArm<'a> {
  label: &'a str,
  predicate: Box<dyn Fn(&HostState) -> bool + 'a>,
}

impl<'a> BuildArm<'a> {
  pub fn new(label: &'a str, predicate: impl Fn(&HostState) -> bool + 'a) -> Self {
    Self {
      label,
      predicate: Box::new(predicate),
    }
  }

  /// Selected when the host identity equals `name`.
  pub fn identity_is(label: &'a str, name: &'a str) -> Self {
    Self::new(label, move |host| host.identity_is(name))
  }

  pub fn label(&self) -> &'a str {
    self.label
  }
}

/// Evaluates build conditions against a lazily probed, cached host state.
pub struct BuildConditions<P: HostProbe> {
  probe: P,
  host: OnceCell<HostState>,
}

impl<P: HostProbe> BuildConditions<P> {
  pub fn new(probe: P) -> Self {
    Self {
      probe,
      host: OnceCell::new(),
    }
  }

  /// Host state, probed on first call.
  pub fn host(&self) -> &HostState {
    self.host.get_or_init(|| {
      let state = HostState::new(self.probe.identity());
      match state.identity() {
        Some(identity) => debug!(identity, "probed synthesis host"),
        None => warn!("synthesis host identity unknown, build conditions take their default branch"),
      }
      state
    })
  }

  /// Evaluate a predicate over host state immediately.
  pub fn evaluate(&self, predicate: impl FnOnce(&HostState) -> bool) -> bool {
    predicate(self.host())
  }

  /// Pick the first arm whose predicate holds, else `default`.
  ///
  /// Arms are tried in order, so overlapping predicates still select exactly
  /// one label.
  pub fn select<'a>(&self, arms: &[BuildArm<'a>], default: &'a str) -> &'a str {
    let host = self.host();
    let selected = arms
      .iter()
      .find(|arm| (arm.predicate)(host))
      .map(|arm| arm.label)
      .unwrap_or(default);
    debug!(branch = selected, "selected build branch");
    selected
  }
}
