//! Implementation of the `condstack preview` command.
//!
//! Instantiates an artifact for concrete parameter values the way the
//! provisioning system would, and lists what exists in that deployment.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use condstack_lib::config::SynthConfig;
use condstack_lib::emit::{Artifact, ArtifactFormat};
use condstack_lib::preview::{Bindings, instantiate};
use condstack_lib::stack;

use crate::output::{OutputFormat, print_info, print_json, print_resource, print_stat, print_success};

pub fn cmd_preview(config: &SynthConfig, params: &[String], artifact: Option<&Path>, output: OutputFormat) -> Result<()> {
  let bindings = Bindings::parse(params.iter().map(String::as_str)).context("Invalid --param")?;

  let artifact = match artifact {
    Some(path) => load_artifact(path)?,
    None => stack::synthesize(config, config.probe()).context("Synthesis failed")?,
  };

  let preview = instantiate(&artifact, &bindings).context("Failed to instantiate artifact")?;

  if output.is_json() {
    return print_json(&preview);
  }

  print_success(&format!("Preview of {}", preview.stack));
  for (name, value) in artifact.parameters().keys().filter_map(|n| bindings.get(n).map(|v| (n, v))) {
    print_stat(name, value);
  }

  println!();
  println!("Conditions:");
  for (id, holds) in &preview.conditions {
    print_stat(id.as_str(), if *holds { "true" } else { "false" });
  }

  println!();
  println!("Resources:");
  for def in artifact.resources().values() {
    let present = preview.resources.contains_key(&def.id);
    let detail = match &def.condition {
      Some(condition) => format!("({}, if {})", def.kind, condition),
      None => format!("({})", def.kind),
    };
    print_resource(present, def.id.as_str(), &detail);
  }

  println!();
  print_info(&format!(
    "{} present, {} omitted",
    preview.resources.len(),
    preview.omitted.len()
  ));
  Ok(())
}

fn load_artifact(path: &Path) -> Result<Artifact> {
  let text = fs::read_to_string(path).with_context(|| format!("Failed to read artifact: {}", path.display()))?;
  ArtifactFormat::from_path(path)
    .parse(&text)
    .with_context(|| format!("Invalid artifact: {}", path.display()))
}
