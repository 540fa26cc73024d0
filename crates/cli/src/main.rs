mod cmd;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lifecycle_lib::platform::paths;

use crate::cmd::{DetectArgs, cmd_detect, exit_code};
use crate::output::print_error;

/// lifecycle - Cloud Native Buildpacks detection
#[derive(Parser)]
#[command(name = "lifecycle")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Log level: error, warn, info, debug or trace (default: $CNB_LOG_LEVEL or info)
  #[arg(long, global = true)]
  log_level: Option<String>,

  /// Enable verbose output (same as --log-level debug)
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Find the first group of buildpacks that passes detection against an app
  Detect(DetectArgs),
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let level = if cli.verbose {
    "debug".to_string()
  } else {
    cli.log_level.unwrap_or_else(paths::log_level)
  };
  let filter = match std::env::var_os("RUST_LOG") {
    Some(_) => EnvFilter::from_default_env(),
    None => match EnvFilter::try_new(&level) {
      Ok(filter) => filter,
      Err(e) => {
        print_error(&format!("invalid log level '{}': {}", level, e));
        return ExitCode::FAILURE;
      }
    },
  };

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Detect(args) => cmd_detect(&args),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&format!("{:#}", err));
      ExitCode::from(exit_code(&err))
    }
  }
}
