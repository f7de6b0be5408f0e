//! Converts an FBP notation file to the JSON graph format.
//!
//! ```text
//! fbp2json graph.fbp > graph.json
//! ```
//!
//! Reads standard input when no path is given.

use std::io::Read;
use std::process::ExitCode;
use tracing::{debug, error};

fn read_source(path: Option<&str>) -> std::io::Result<String> {
  match path {
    Some(path) => std::fs::read_to_string(path),
    None => {
      let mut source = String::new();
      std::io::stdin().read_to_string(&mut source)?;
      Ok(source)
    }
  }
}

fn main() -> ExitCode {
  tracing_subscriber::fmt().with_writer(std::io::stderr).init();

  let path = std::env::args().nth(1);
  let source = match read_source(path.as_deref()) {
    Ok(source) => source,
    Err(err) => {
      error!(path = path.as_deref().unwrap_or("<stdin>"), error = %err, "cannot read input");
      return ExitCode::FAILURE;
    }
  };

  let definition = match flowweave::fbp::parse(&source) {
    Ok(definition) => definition,
    Err(err) => {
      error!(error = %err, "invalid FBP notation");
      return ExitCode::FAILURE;
    }
  };
  debug!(
    processes = definition.processes.len(),
    connections = definition.connections.len(),
    "parsed graph"
  );

  match serde_json::to_string_pretty(&definition) {
    Ok(json) => {
      println!("{json}");
      ExitCode::SUCCESS
    }
    Err(err) => {
      error!(error = %err, "cannot serialize graph");
      ExitCode::FAILURE
    }
  }
}
