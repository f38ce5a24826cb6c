mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use condstack_lib::config::{self, SynthConfig};

use crate::cmd::{cmd_info, cmd_preview, cmd_synth};
use crate::output::{OutputFormat, TemplateFormat, print_error};

/// condstack - synthesize the conditional stack
#[derive(Parser)]
#[command(name = "condstack")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Config file (default: $CONDSTACK_CONFIG, then ./condstack.toml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Output format for command summaries
  #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Synthesize the stack and write its artifact
  Synth {
    /// Output directory (overrides the config)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Artifact format
    #[arg(long, value_enum, default_value_t = TemplateFormat::Json)]
    format: TemplateFormat,

    /// Print the artifact instead of writing it
    #[arg(long)]
    stdout: bool,
  },

  /// Show what a deployment would materialize for given parameter values
  Preview {
    /// Parameter binding, NAME=VALUE (repeatable)
    #[arg(short, long = "param", value_name = "NAME=VALUE")]
    params: Vec<String>,

    /// Previously emitted artifact (default: synthesize now)
    #[arg(long)]
    artifact: Option<PathBuf>,
  },

  /// Show the synthesis host identity and the build branch it selects
  Info,
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match run(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{e:#}"));
      ExitCode::FAILURE
    }
  }
}

fn run(cli: Cli) -> Result<()> {
  let config = load_config(cli.config.as_deref())?;

  match cli.command {
    Commands::Synth { out, format, stdout } => cmd_synth(&config, out, format, stdout, cli.output),
    Commands::Preview { params, artifact } => cmd_preview(&config, &params, artifact.as_deref(), cli.output),
    Commands::Info => cmd_info(&config, cli.output),
  }
}

fn load_config(path: Option<&std::path::Path>) -> Result<SynthConfig> {
  config::load(path).context("Failed to load config")
}
