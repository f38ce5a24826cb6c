//! Implementation of the `condstack synth` command.
//!
//! Synthesizes the stack against the current host and writes the artifact to
//! `<out>/<stack>.template.<ext>`.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use condstack_lib::config::SynthConfig;
use condstack_lib::emit::ArtifactFormat;
use condstack_lib::graph::ResourceKind;
use condstack_lib::stack;
use condstack_lib::util::hash::Hashable;

use crate::output::{OutputFormat, TemplateFormat, print_json, print_stat, print_success, truncate_hash};

pub fn cmd_synth(
  config: &SynthConfig,
  out: Option<PathBuf>,
  format: TemplateFormat,
  to_stdout: bool,
  output: OutputFormat,
) -> Result<()> {
  let artifact = stack::synthesize(config, config.probe()).context("Synthesis failed")?;
  let format = ArtifactFormat::from(format);
  let text = artifact.render(format).context("Failed to serialize artifact")?;

  if to_stdout {
    print!("{text}");
    if !text.ends_with('\n') {
      println!();
    }
    return Ok(());
  }

  let hash = artifact.compute_hash().context("Failed to compute artifact hash")?;

  let out_dir = out.unwrap_or_else(|| config.out_dir.clone());
  fs::create_dir_all(&out_dir).with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;
  let path = out_dir.join(format!("{}.template.{}", artifact.stack(), format.extension()));
  fs::write(&path, &text).with_context(|| format!("Failed to write artifact: {}", path.display()))?;
  info!(path = %path.display(), hash = %hash, "wrote artifact");

  if output.is_json() {
    let summary = serde_json::json!({
      "stack": artifact.stack(),
      "hash": hash.0,
      "path": path.display().to_string(),
      "parameters": artifact.parameters().len(),
      "conditions": artifact.conditions().len(),
      "resources": artifact.resources().len(),
      "schedules": artifact.count(ResourceKind::Schedule),
      "grants": artifact.count(ResourceKind::PermissionGrant),
    });
    print_json(&summary)?;
  } else {
    print_success(&format!("Synthesized {}", artifact.stack()));
    print_stat("Hash", truncate_hash(&hash.0));
    print_stat("Parameters", &artifact.parameters().len().to_string());
    print_stat("Conditions", &artifact.conditions().len().to_string());
    print_stat("Resources", &artifact.resources().len().to_string());
    print_stat("Schedules", &artifact.count(ResourceKind::Schedule).to_string());
    print_stat("Grants", &artifact.count(ResourceKind::PermissionGrant).to_string());
    print_stat("Path", &path.display().to_string());
  }

  Ok(())
}
