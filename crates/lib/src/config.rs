//! Synthesis configuration.
//!
//! Sources, lowest priority first: built-in defaults, a TOML file, then
//! `CONDSTACK_*` environment overrides. The file is the one passed explicitly,
//! else `$CONDSTACK_CONFIG`, else `./condstack.toml` if it exists.
//!
//! ```toml
//! stack_name = "custom-cdk-stack"
//! prod_value = "prod"
//!
//! [schedules.dev]
//! value = 5
//! unit = "minutes"
//!
//! [host]
//! variable = "USER"
//! identity = "alice"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::condition::EnvProbe;
use crate::consts::{
  DEFAULT_BRANCH, DEFAULT_CONFIG_FILE, DEFAULT_HOST_VAR, DEFAULT_OUT_DIR, DEFAULT_STACK_NAME, ENV_CONFIG, ENV_HOST_MATCH, ENV_HOST_VAR,
  ENV_OUT_DIR,
};
use crate::error::{SynthError, check_name};
use crate::graph::Rate;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid config {path}: {message}")]
  Parse { path: PathBuf, message: String },

  #[error(transparent)]
  Invalid(#[from] SynthError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SynthConfig {
  pub stack_name: String,
  pub out_dir: PathBuf,
  pub parameter: ParameterConfig,
  /// Literal the deployment parameter is compared against for `IsProd`.
  pub prod_value: String,
  pub schedules: ScheduleConfig,
  pub host: HostConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParameterConfig {
  pub name: String,
  pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
  pub prod: Rate,
  pub dev: Rate,
}

/// Build-time branch selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
  /// Environment variable holding the host identity.
  pub variable: String,
  /// Identity that selects the named branch.
  pub identity: String,
  /// Prefix of the branch bucket's id.
  pub prefix: String,
}

impl Default for SynthConfig {
  fn default() -> Self {
    Self {
      stack_name: DEFAULT_STACK_NAME.to_string(),
      out_dir: PathBuf::from(DEFAULT_OUT_DIR),
      parameter: ParameterConfig::default(),
      prod_value: "prod".to_string(),
      schedules: ScheduleConfig::default(),
      host: HostConfig::default(),
    }
  }
}

impl Default for ParameterConfig {
  fn default() -> Self {
    Self {
      name: "env".to_string(),
      description: "Current deployment environment name".to_string(),
    }
  }
}

impl Default for ScheduleConfig {
  fn default() -> Self {
    Self {
      prod: Rate::minutes(60),
      dev: Rate::minutes(5),
    }
  }
}

impl Default for HostConfig {
  fn default() -> Self {
    Self {
      variable: DEFAULT_HOST_VAR.to_string(),
      identity: "alice".to_string(),
      prefix: "bucket-user-".to_string(),
    }
  }
}

impl SynthConfig {
  pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
    toml::from_str(text).map_err(|e| ConfigError::Parse {
      path: path.to_path_buf(),
      message: e.to_string(),
    })
  }

  /// Host probe reading the configured identity variable.
  pub fn probe(&self) -> EnvProbe {
    EnvProbe::new(&self.host.variable)
  }

  /// Reject values that would only fail on some hosts.
  ///
  /// The branch bucket id embeds the identity on the matching host alone, so
  /// both candidate ids are checked here rather than at selection.
  pub fn validate(&self) -> crate::error::Result<()> {
    check_name(&self.stack_name)?;
    check_name(&self.parameter.name)?;

    let identity = self.host.identity.as_str();
    if identity.is_empty() {
      return Err(SynthError::InvalidConfig("host.identity is empty".to_string()));
    }
    if identity == DEFAULT_BRANCH {
      return Err(SynthError::InvalidConfig(format!(
        "host.identity '{DEFAULT_BRANCH}' is the default branch label"
      )));
    }
    for branch in [identity, DEFAULT_BRANCH] {
      let id = format!("{}{branch}", self.host.prefix);
      check_name(&id).map_err(|_| {
        SynthError::InvalidConfig(format!("branch bucket id '{id}' is not a valid logical name"))
      })?;
    }
    Ok(())
  }

  /// Apply `CONDSTACK_*` overrides. Empty values are ignored.
  pub fn with_env_overrides(mut self) -> Self {
    if let Some(dir) = non_empty_var(ENV_OUT_DIR) {
      self.out_dir = PathBuf::from(dir);
    }
    if let Some(var) = non_empty_var(ENV_HOST_VAR) {
      self.host.variable = var;
    }
    if let Some(identity) = non_empty_var(ENV_HOST_MATCH) {
      self.host.identity = identity;
    }
    self
  }
}

fn non_empty_var(name: &str) -> Option<String> {
  std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Load configuration from `explicit`, the environment or the working directory.
///
/// # Errors
///
/// An explicitly named file (argument or `$CONDSTACK_CONFIG`) that can't be
/// read, or any file that doesn't parse.
pub fn load(explicit: Option<&Path>) -> Result<SynthConfig, ConfigError> {
  let named = explicit
    .map(Path::to_path_buf)
    .or_else(|| non_empty_var(ENV_CONFIG).map(PathBuf::from));

  let path = match named {
    Some(path) => Some(path),
    None => {
      let local = PathBuf::from(DEFAULT_CONFIG_FILE);
      local.is_file().then_some(local)
    }
  };

  let config = match path {
    Some(path) => {
      let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
      })?;
      debug!(path = %path.display(), "loaded config");
      SynthConfig::from_toml(&text, &path)?
    }
    None => SynthConfig::default(),
  };

  let config = config.with_env_overrides();
  config.validate()?;
  Ok(config)
}
