//! Implementation of the `condstack info` command.

use anyhow::Result;

use condstack_lib::condition::BuildConditions;
use condstack_lib::config::SynthConfig;
use condstack_lib::stack::branch_bucket_id;

use crate::output::{OutputFormat, print_json, print_stat, print_warning};

pub fn cmd_info(config: &SynthConfig, output: OutputFormat) -> Result<()> {
  let probe = config.probe();
  let host = BuildConditions::new(&probe);
  let identity = host.host().identity().map(str::to_string);
  let bucket = branch_bucket_id(config, &host);

  if output.is_json() {
    return print_json(&serde_json::json!({
      "version": env!("CARGO_PKG_VERSION"),
      "stack": config.stack_name,
      "host_variable": probe.var(),
      "identity": identity,
      "match": config.host.identity,
      "branch_resource": bucket,
    }));
  }

  println!("Host:");
  print_stat("Variable", probe.var());
  match &identity {
    Some(identity) => print_stat("Identity", identity),
    None => {
      print_stat("Identity", "unknown");
      print_warning("Host identity unknown; the default build branch applies.");
    }
  }
  print_stat("Match", &config.host.identity);
  print_stat("Branch", &bucket);
  Ok(())
}
